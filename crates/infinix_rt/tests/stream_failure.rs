use infinix_rt::*;

// Kept out of the shared test binary: a failed stream also fails device-wide
// synchronization until the stream itself is synchronized.

fn setup() {
    assert_eq!(rt_init(), RT_SUCCESS);
    assert_eq!(rt_set_device(RT_DEVICE_CPU, 0), RT_SUCCESS);
}

#[test]
fn panicking_task_is_reported_once() {
    setup();
    unsafe {
        let mut stream: RtStream = std::ptr::null_mut();
        assert_eq!(rt_stream_create(&mut stream), RT_SUCCESS);

        assert_eq!(rt_launch_host_func(stream, Box::new(|| panic!("kernel failure"))), RT_SUCCESS);
        assert_eq!(rt_stream_synchronize(stream), RT_ERROR_LAUNCH_FAILED);
        assert_eq!(rt_stream_synchronize(stream), RT_SUCCESS);

        assert_eq!(rt_stream_destroy(stream), RT_SUCCESS);
    }
}

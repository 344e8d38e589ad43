use infinix_core::{
    device::Device,
    error::{Error, Result},
    rt::RT_ERROR_NOT_INITIALIZED,
};
use infinix_tensor::{Graph, Runtime};

// Runs in its own test binary so the device runtime is not initialized yet.
#[test]
fn context_requires_initialization() -> Result<()> {
    let runtime = Runtime::new();
    assert!(matches!(runtime.current_thread_context(), Err(Error::ContextNotInitialized)));
    assert!(matches!(
        runtime.run(&Graph::new(runtime.clone())),
        Err(Error::ContextNotInitialized)
    ));
    assert!(matches!(
        runtime.init_thread_context(Device::CPU, 0),
        Err(Error::Runtime { code: RT_ERROR_NOT_INITIALIZED, .. })
    ));
    assert!(Runtime::all_device_count().is_err());

    Runtime::init()?;
    let ctx = runtime.init_thread_context(Device::CPU, 0)?;
    assert_eq!(ctx.device(), Device::CPU);
    Ok(())
}

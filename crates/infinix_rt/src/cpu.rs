use crate::{
    HostFn, RtStream, RT_ERROR_INVALID_STREAM, RT_ERROR_LAUNCH_FAILED, RT_ERROR_OUT_OF_MEMORY, RT_SUCCESS,
};
use std::{
    ffi::c_void,
    panic::{self, AssertUnwindSafe},
    ptr,
    sync::{mpsc, Arc, Condvar, LazyLock, Mutex, Weak},
    thread::{self, JoinHandle},
};

// Host streams are worker threads draining a FIFO queue, so enqueue order is
// execution order.

#[derive(Default)]
struct QueueState {
    pending: usize,
    failed: bool,
}

struct CpuStream {
    sender: Mutex<Option<mpsc::Sender<HostFn>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    state: Arc<(Mutex<QueueState>, Condvar)>,
}

impl CpuStream {
    fn spawn() -> Option<Arc<Self>> {
        let (sender, receiver) = mpsc::channel::<HostFn>();
        let state = Arc::new((Mutex::new(QueueState::default()), Condvar::new()));
        let worker_state = Arc::clone(&state);

        let worker = thread::Builder::new()
            .name("infinix-cpu-stream".into())
            .spawn(move || {
                while let Ok(task) = receiver.recv() {
                    let ok = panic::catch_unwind(AssertUnwindSafe(task)).is_ok();
                    let (lock, cvar) = &*worker_state;
                    let mut queue = lock.lock().unwrap_or_else(|e| e.into_inner());
                    queue.pending -= 1;
                    if !ok {
                        queue.failed = true;
                    }
                    cvar.notify_all();
                }
            })
            .ok()?;

        Some(Arc::new(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            state,
        }))
    }

    fn enqueue(&self, task: HostFn) -> i32 {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = sender.as_ref() else {
            return RT_ERROR_INVALID_STREAM;
        };

        {
            let (lock, _) = &*self.state;
            lock.lock().unwrap_or_else(|e| e.into_inner()).pending += 1;
        }
        if sender.send(task).is_err() {
            let (lock, cvar) = &*self.state;
            lock.lock().unwrap_or_else(|e| e.into_inner()).pending -= 1;
            cvar.notify_all();
            return RT_ERROR_INVALID_STREAM;
        }
        RT_SUCCESS
    }

    /// Waits for the queue to drain. A failure is reported once, to the first
    /// stream-level synchronize that observes it.
    fn synchronize(&self, consume_failure: bool) -> i32 {
        let (lock, cvar) = &*self.state;
        let mut queue = lock.lock().unwrap_or_else(|e| e.into_inner());
        while queue.pending > 0 {
            queue = cvar.wait(queue).unwrap_or_else(|e| e.into_inner());
        }
        if queue.failed {
            if consume_failure {
                queue.failed = false;
            }
            return RT_ERROR_LAUNCH_FAILED;
        }
        RT_SUCCESS
    }

    fn shutdown(&self) -> i32 {
        // Closing the channel lets the worker drain what is queued and exit.
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        match worker {
            // Destroyed from one of its own tasks: the worker exits after this task.
            Some(handle) if handle.thread().id() == thread::current().id() => RT_SUCCESS,
            Some(handle) => {
                if handle.join().is_err() {
                    RT_ERROR_LAUNCH_FAILED
                } else {
                    RT_SUCCESS
                }
            }
            None => RT_SUCCESS,
        }
    }
}

static STREAMS: LazyLock<Mutex<Vec<Weak<CpuStream>>>> = LazyLock::new(|| Mutex::new(Vec::new()));

unsafe fn stream_ref<'a>(stream: RtStream) -> Option<&'a CpuStream> {
    (stream as *const CpuStream).as_ref()
}

struct SendPtr(*mut c_void);

unsafe impl Send for SendPtr {}

pub(crate) unsafe fn stream_create(stream: *mut RtStream) -> i32 {
    let Some(created) = CpuStream::spawn() else {
        return RT_ERROR_OUT_OF_MEMORY;
    };
    {
        let mut streams = STREAMS.lock().unwrap_or_else(|e| e.into_inner());
        streams.retain(|s| s.strong_count() > 0);
        streams.push(Arc::downgrade(&created));
    }
    *stream = Arc::into_raw(created) as RtStream;
    RT_SUCCESS
}

pub(crate) unsafe fn stream_destroy(stream: RtStream) -> i32 {
    if stream.is_null() {
        return RT_ERROR_INVALID_STREAM;
    }
    let owned = Arc::from_raw(stream as *const CpuStream);
    owned.shutdown()
}

pub(crate) unsafe fn stream_synchronize(stream: RtStream) -> i32 {
    match stream_ref(stream) {
        Some(s) => s.synchronize(true),
        None => RT_SUCCESS,
    }
}

pub(crate) fn device_synchronize() -> i32 {
    let live: Vec<Arc<CpuStream>> = {
        let streams = STREAMS.lock().unwrap_or_else(|e| e.into_inner());
        streams.iter().filter_map(Weak::upgrade).collect()
    };
    let mut status = RT_SUCCESS;
    for stream in live {
        let s = stream.synchronize(false);
        if status == RT_SUCCESS {
            status = s;
        }
    }
    status
}

pub(crate) unsafe fn malloc(ptr: *mut *mut c_void, size: usize) -> i32 {
    let raw = libc::malloc(size.max(1));
    if raw.is_null() {
        return RT_ERROR_OUT_OF_MEMORY;
    }
    *ptr = raw;
    RT_SUCCESS
}

pub(crate) unsafe fn free(ptr: *mut c_void) -> i32 {
    libc::free(ptr);
    RT_SUCCESS
}

pub(crate) unsafe fn memcpy(dst: *mut c_void, src: *const c_void, size: usize) -> i32 {
    if size > 0 {
        ptr::copy_nonoverlapping(src as *const u8, dst as *mut u8, size);
    }
    RT_SUCCESS
}

pub(crate) unsafe fn launch_host_func(stream: RtStream, func: HostFn) -> i32 {
    match stream_ref(stream) {
        Some(s) => s.enqueue(func),
        None => {
            if panic::catch_unwind(AssertUnwindSafe(func)).is_err() {
                return RT_ERROR_LAUNCH_FAILED;
            }
            RT_SUCCESS
        }
    }
}

pub(crate) unsafe fn memcpy_async(dst: *mut c_void, src: *const c_void, size: usize, stream: RtStream) -> i32 {
    let dst = SendPtr(dst);
    let src = SendPtr(src as *mut c_void);
    launch_host_func(
        stream,
        Box::new(move || {
            let (dst, src) = (dst, src);
            unsafe {
                memcpy(dst.0, src.0, size);
            }
        }),
    )
}

pub(crate) unsafe fn malloc_async(ptr: *mut *mut c_void, size: usize, _stream: RtStream) -> i32 {
    // Host allocation is immediate; the pointer is usable by anything ordered
    // after this call anyway.
    malloc(ptr, size)
}

pub(crate) unsafe fn free_async(ptr: *mut c_void, stream: RtStream) -> i32 {
    let ptr = SendPtr(ptr);
    launch_host_func(
        stream,
        Box::new(move || {
            let ptr = ptr;
            unsafe {
                free(ptr.0);
            }
        }),
    )
}

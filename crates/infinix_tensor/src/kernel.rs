use crate::{operator::OpRef, runtime::Stream};
use infinix_core::{
    device::Device,
    error::{Error, Result},
    op_type::OpType,
};
use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, LazyLock, RwLock,
    },
};

/// Dispatch key of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelAttrs {
    pub device: Device,
    pub op_type: OpType,
}

impl KernelAttrs {
    pub fn new(device: Device, op_type: OpType) -> Self {
        Self { device, op_type }
    }
}

impl fmt::Display for KernelAttrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.device, self.op_type)
    }
}

/// Device implementation of one operator kind.
///
/// `compute` issues work on `stream` and may return before it has run; the
/// caller synchronizes to observe the results.
pub trait Kernel: Send + Sync {
    fn compute(&self, op: OpRef<'_>, stream: &Stream) -> Result<()>;
}

#[derive(Clone)]
pub struct KernelRecord {
    pub kernel: Arc<dyn Kernel>,
    pub name: String,
    pub seq: usize,
}

impl fmt::Debug for KernelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelRecord")
            .field("name", &self.name)
            .field("seq", &self.seq)
            .finish()
    }
}

/// One row of a static kernel table.
pub struct KernelEntry {
    pub attrs: KernelAttrs,
    pub name: &'static str,
    pub create: fn() -> Arc<dyn Kernel>,
}

/// Builds a `&'static [KernelEntry]` table.
///
/// ```ignore
/// register_kernels!(CPU_KERNELS: [
///     (Device::CPU, OpType::Add) => BinaryKernel(OpType::Add), "cpu_add";
/// ]);
/// ```
#[macro_export]
macro_rules! register_kernels {
    ($table:ident: [$(($device:expr, $op_type:expr) => $kernel:expr, $name:literal;)*]) => {
        pub static $table: &[$crate::kernel::KernelEntry] = &[
            $(
                $crate::kernel::KernelEntry {
                    attrs: $crate::kernel::KernelAttrs { device: $device, op_type: $op_type },
                    name: $name,
                    create: || ::std::sync::Arc::new($kernel),
                },
            )*
        ];
    };
}

static GLOBAL_REGISTRY: LazyLock<Arc<KernelRegistry>> = LazyLock::new(|| Arc::new(KernelRegistry::new()));

/// Kernels keyed by `(device, op type)`, at most one per key.
#[derive(Default)]
pub struct KernelRegistry {
    kernels: RwLock<BTreeMap<KernelAttrs, KernelRecord>>,
    count: AtomicUsize,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by `Runtime::new`.
    pub fn global() -> Arc<KernelRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Stores `kernel` under `attrs` and returns its sequence number.
    pub fn register_kernel(&self, attrs: KernelAttrs, kernel: Arc<dyn Kernel>, name: impl Into<String>) -> Result<usize> {
        let mut kernels = self.kernels.write().map_err(|_| Error::Lock)?;
        if kernels.contains_key(&attrs) {
            return Err(Error::DuplicateKernel {
                device: attrs.device,
                op_type: attrs.op_type,
            });
        }
        let seq = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        let name = name.into();
        log::debug!("registered kernel {} for {} as #{}", name, attrs, seq);
        kernels.insert(attrs, KernelRecord { kernel, name, seq });
        Ok(seq)
    }

    pub fn register_entries(&self, entries: &[KernelEntry]) -> Result<()> {
        for entry in entries {
            self.register_kernel(entry.attrs, (entry.create)(), entry.name)?;
        }
        Ok(())
    }

    pub fn get_kernel(&self, attrs: &KernelAttrs) -> Result<Arc<dyn Kernel>> {
        self.get_kernel_record(attrs).map(|r| r.kernel)
    }

    pub fn get_kernel_record(&self, attrs: &KernelAttrs) -> Result<KernelRecord> {
        let kernels = self.kernels.read().map_err(|_| Error::Lock)?;
        kernels.get(attrs).cloned().ok_or(Error::KernelNotFound {
            device: attrs.device,
            op_type: attrs.op_type,
        })
    }

    pub fn contains(&self, attrs: &KernelAttrs) -> bool {
        self.kernels.read().map(|k| k.contains_key(attrs)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.kernels.read().map(|k| k.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every registration, ordered by key.
    pub fn records(&self) -> Vec<(KernelAttrs, KernelRecord)> {
        self.kernels
            .read()
            .map(|k| k.iter().map(|(a, r)| (*a, r.clone())).collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for KernelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.records()).finish()
    }
}

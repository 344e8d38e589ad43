use infinix_core::{
    device::Device,
    error::{Error, Result},
    op_type::OpType,
};
use infinix_tensor::{
    kernels::{cpu::CPU_KERNELS, register_builtin_kernels},
    Kernel, KernelAttrs, KernelRegistry, OpRef, Stream,
};
use std::sync::Arc;

struct Noop;

impl Kernel for Noop {
    fn compute(&self, _op: OpRef<'_>, _stream: &Stream) -> Result<()> {
        Ok(())
    }
}

#[test]
fn lookup_returns_registered_instance() -> Result<()> {
    let registry = KernelRegistry::new();
    let attrs = KernelAttrs::new(Device::CPU, OpType::Add);
    let kernel: Arc<dyn Kernel> = Arc::new(Noop);

    let seq = registry.register_kernel(attrs, Arc::clone(&kernel), "noop_add")?;
    assert_eq!(seq, 1);
    assert!(Arc::ptr_eq(&registry.get_kernel(&attrs)?, &kernel));

    let record = registry.get_kernel_record(&attrs)?;
    assert_eq!(record.name, "noop_add");
    assert_eq!(record.seq, 1);
    Ok(())
}

#[test]
fn duplicate_key_is_rejected() -> Result<()> {
    let registry = KernelRegistry::new();
    let attrs = KernelAttrs::new(Device::CPU, OpType::Relu);
    registry.register_kernel(attrs, Arc::new(Noop), "first")?;
    assert!(matches!(
        registry.register_kernel(attrs, Arc::new(Noop), "second"),
        Err(Error::DuplicateKernel { device: Device::CPU, op_type: OpType::Relu })
    ));
    assert_eq!(registry.get_kernel_record(&attrs)?.name, "first");
    assert_eq!(registry.len(), 1);
    Ok(())
}

#[test]
fn missing_key_is_an_error() -> Result<()> {
    let registry = KernelRegistry::new();
    registry.register_kernel(KernelAttrs::new(Device::CPU, OpType::Add), Arc::new(Noop), "add")?;
    // same op, other device
    assert!(matches!(
        registry.get_kernel(&KernelAttrs::new(Device::CUDA, OpType::Add)),
        Err(Error::KernelNotFound { device: Device::CUDA, op_type: OpType::Add })
    ));
    assert!(registry.get_kernel(&KernelAttrs::new(Device::CPU, OpType::Sub)).is_err());
    Ok(())
}

#[test]
fn sequence_numbers_increase() -> Result<()> {
    let registry = KernelRegistry::new();
    let a = registry.register_kernel(KernelAttrs::new(Device::CPU, OpType::Neg), Arc::new(Noop), "neg")?;
    let b = registry.register_kernel(KernelAttrs::new(Device::CPU, OpType::Abs), Arc::new(Noop), "abs")?;
    assert!(b > a);
    Ok(())
}

#[test]
fn builtin_tables() -> Result<()> {
    let registry = KernelRegistry::new();
    register_builtin_kernels(&registry)?;
    assert_eq!(registry.len(), CPU_KERNELS.len());
    for op_type in OpType::ALL {
        assert!(registry.contains(&KernelAttrs::new(Device::CPU, op_type)));
    }
    assert!(matches!(
        register_builtin_kernels(&registry),
        Err(Error::DuplicateKernel { .. })
    ));

    let names: Vec<String> = registry.records().into_iter().map(|(_, r)| r.name).collect();
    assert!(names.contains(&"cpu_matmul".to_string()));
    Ok(())
}

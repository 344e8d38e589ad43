mod utils;

use infinix_core::{
    dtype::DType,
    error::{Error, Result},
};
use infinix_tensor::{BlobObject, Tensor};
use utils::setup;

#[test]
fn creation() -> Result<()> {
    let t = Tensor::new(&[2, 3], DType::F32)?;
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(t.stride(), &[3, 1]);
    assert_eq!(t.rank(), 2);
    assert_eq!(t.size(), 6);
    assert_eq!(t.storage_size(), 6);
    assert_eq!(t.bytes(), 24);
    assert!(t.data().is_none());
    assert!(t.source().is_none());
    assert!(t.targets().is_empty());

    assert!(matches!(Tensor::new(&[2, 0], DType::F32), Err(Error::InvalidShape { .. })));
    assert!(Tensor::with_stride(&[2, 3], &[1], DType::F32).is_err());
    Ok(())
}

#[test]
fn scalar_and_views() -> Result<()> {
    let scalar = Tensor::new(&[], DType::F64)?;
    assert_eq!(scalar.storage_size(), 1);
    assert_eq!(scalar.bytes(), 8);

    let broadcast = Tensor::with_stride(&[4, 3], &[0, 1], DType::I32)?;
    assert_eq!(broadcast.storage_size(), 3);
    assert!(!broadcast.is_contiguous());

    let reversed = Tensor::with_stride(&[5], &[-1], DType::U8)?;
    assert_eq!(reversed.storage_size(), 5);
    assert_eq!(reversed.origin_offset(), 4);
    Ok(())
}

#[test]
fn ids_are_unique_and_duplicate_keeps_fuid() -> Result<()> {
    let a = Tensor::new(&[2], DType::F16)?;
    let b = Tensor::new(&[2], DType::F16)?;
    assert_ne!(a.id(), b.id());
    assert_ne!(a.fuid(), b.fuid());

    let c = a.duplicate();
    assert_ne!(c.id(), a.id());
    assert_eq!(c.fuid(), a.fuid());
    assert_eq!(c.shape(), a.shape());
    assert_eq!(c.dtype(), a.dtype());
    assert!(c.data().is_none());
    Ok(())
}

#[test]
fn storage_is_bound_once() -> Result<()> {
    let (runtime, _ctx) = setup()?;
    let mut t = Tensor::new(&[2, 3], DType::F32)?;
    t.data_malloc(&runtime)?;

    let blob = t.blob()?.clone();
    assert_eq!(blob.size(), 24);
    assert!(std::sync::Arc::ptr_eq(&blob, t.blob()?));

    assert!(matches!(t.data_malloc(&runtime), Err(Error::AlreadyAllocated { .. })));
    let other = BlobObject::alloc(&runtime, 24)?;
    assert!(matches!(t.bind_data(other), Err(Error::AlreadyAllocated { .. })));
    Ok(())
}

#[test]
fn storage_cannot_back_two_tensors() -> Result<()> {
    let (runtime, _ctx) = setup()?;
    let mut a = Tensor::new(&[4], DType::F32)?;
    let mut b = Tensor::new(&[4], DType::F32)?;

    let blob = BlobObject::alloc(&runtime, 16)?;
    assert!(matches!(b.bind_data(blob.clone()), Err(Error::InvalidArgument(_))));
    a.bind_data(blob)?;
    assert!(matches!(b.bind_data(a.blob()?.clone()), Err(Error::InvalidArgument(_))));

    // a weak handle could be upgraded later, so it counts as sharing
    let fresh = BlobObject::alloc(&runtime, 16)?;
    let weak = std::sync::Arc::downgrade(&fresh);
    assert!(matches!(b.bind_data(fresh), Err(Error::InvalidArgument(_))));
    assert!(weak.upgrade().is_none());

    b.bind_data(BlobObject::alloc(&runtime, 16)?)?;
    assert_ne!(a.blob()?.ptr(), b.blob()?.ptr());
    Ok(())
}

#[test]
fn bind_checks_capacity() -> Result<()> {
    let (runtime, _ctx) = setup()?;
    let mut t = Tensor::new(&[4], DType::F64)?;
    assert!(t.bind_data(BlobObject::alloc(&runtime, 16)?).is_err());
    t.bind_data(BlobObject::alloc(&runtime, 32)?)?;

    // shrinking fits, growing past the storage does not
    t.set_shape(&[2, 2])?;
    assert_eq!(t.stride(), &[2, 1]);
    assert!(t.set_shape(&[3, 2]).is_err());
    assert_eq!(t.shape(), &[2, 2]);
    assert!(t.set_stride(&[4, 1]).is_err());
    t.set_stride(&[1, 2])?;
    Ok(())
}

#[test]
fn host_copies() -> Result<()> {
    let (runtime, _ctx) = setup()?;
    let mut t = Tensor::new(&[2, 2], DType::I32)?;
    assert!(matches!(t.copy_to_host::<i32>(&runtime), Err(Error::NotAllocated { .. })));

    t.data_malloc(&runtime)?;
    t.copy_from_host(&runtime, &[1i32, -2, 3, -4])?;
    assert_eq!(t.copy_to_host::<i32>(&runtime)?, vec![1, -2, 3, -4]);

    assert!(matches!(
        t.copy_from_host(&runtime, &[1.0f32, 2.0, 3.0, 4.0]),
        Err(Error::DTypeMismatch { .. })
    ));
    assert!(matches!(t.copy_from_host(&runtime, &[1i32, 2]), Err(Error::ShapeMismatch { .. })));
    Ok(())
}

#[test]
fn display() -> Result<()> {
    let (runtime, _ctx) = setup()?;
    let mut t = Tensor::new(&[2, 3], DType::F32)?;
    let text = t.to_string();
    assert!(text.contains(&format!("Tensor {}", t.id())));
    assert!(text.contains(&format!("Fuid {}", t.fuid())));
    assert!(text.contains("shape [2, 3]"));
    assert!(text.contains("stride [3, 1]"));
    assert!(text.contains("F32"));
    assert!(text.contains("no data"));
    assert!(text.contains("source None"));
    assert!(text.contains("targets []"));

    t.data_malloc(&runtime)?;
    assert!(!t.to_string().contains("no data"));
    Ok(())
}

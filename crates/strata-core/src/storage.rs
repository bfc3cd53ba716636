use std::sync::Arc;

use crate::dtype::Element;
use crate::{ArithError, DType, Device, Result};

/// Backing memory for tensor data.
///
/// Host memory is kept as 8-byte words so every supported element type can be
/// viewed in place without alignment surprises.
#[derive(Debug, Clone)]
pub enum StorageData {
    /// Host heap storage.
    Cpu(Vec<u64>),
    /// Memory owned by another device. The host holds no bytes for it.
    Remote,
}

/// Shared, reference-counted tensor storage.
///
/// Clones share the same buffer; the first write through a shared handle
/// copies it (copy-on-write), so views never observe each other's writes.
#[derive(Debug, Clone)]
pub struct Storage {
    data: Arc<StorageData>,
    dtype: DType,
    device: Device,
    /// Number of logical elements (not bytes).
    numel: usize,
}

fn words_for(nbytes: usize) -> usize {
    (nbytes + 7) / 8
}

impl Storage {
    /// Allocate new zeroed CPU storage for `numel` elements of the given dtype.
    pub fn zeros(dtype: DType, numel: usize) -> Self {
        let words = vec![0u64; words_for(dtype.storage_bytes(numel))];
        Self {
            data: Arc::new(StorageData::Cpu(words)),
            dtype,
            device: Device::Cpu,
            numel,
        }
    }

    /// Create storage holding a copy of `data`.
    pub fn from_slice<T: Element>(data: &[T]) -> Self {
        let mut words = vec![0u64; words_for(std::mem::size_of_val(data))];
        let bytes: &[u8] = bytemuck::cast_slice(data);
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
        Self {
            data: Arc::new(StorageData::Cpu(words)),
            dtype: T::DTYPE,
            device: Device::Cpu,
            numel: data.len(),
        }
    }

    /// Create storage from a slice of f32 values.
    pub fn from_f32(data: &[f32]) -> Self {
        Self::from_slice(data)
    }

    /// Create storage from a slice of f64 values.
    pub fn from_f64(data: &[f64]) -> Self {
        Self::from_slice(data)
    }

    /// Create storage from a slice of i32 values.
    pub fn from_i32(data: &[i32]) -> Self {
        Self::from_slice(data)
    }

    /// Create boolean storage, one byte per element.
    pub fn from_bools(data: &[bool]) -> Self {
        let bytes: Vec<u8> = data.iter().map(|&b| b as u8).collect();
        let mut storage = Self::zeros(DType::Bool, data.len());
        if let StorageData::Cpu(words) = Arc::make_mut(&mut storage.data) {
            bytemuck::cast_slice_mut::<u64, u8>(words)[..bytes.len()].copy_from_slice(&bytes);
        }
        storage
    }

    /// Describe a buffer that lives on another device.
    pub fn remote(dtype: DType, numel: usize, device: Device) -> Self {
        Self {
            data: Arc::new(StorageData::Remote),
            dtype,
            device,
            numel,
        }
    }

    /// Get the dtype of this storage.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Get the device of this storage.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Number of logical elements.
    pub fn numel(&self) -> usize {
        self.numel
    }

    /// Size in bytes of the logical elements.
    pub fn nbytes(&self) -> usize {
        self.dtype.storage_bytes(self.numel)
    }

    /// Whether the host can address this storage directly.
    pub fn is_natively_accessible(&self) -> bool {
        matches!(self.data.as_ref(), StorageData::Cpu(_)) && self.device.is_host_addressable()
    }

    /// Get a read-only reference to the raw bytes.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self.data.as_ref() {
            StorageData::Cpu(words) => Ok(&bytemuck::cast_slice::<u64, u8>(words)[..self.nbytes()]),
            StorageData::Remote => Err(ArithError::InaccessibleData(format!(
                "storage of {} {} elements on {}",
                self.numel, self.dtype, self.device
            ))),
        }
    }

    /// Get a mutable reference to the raw bytes.
    /// Clones the underlying data if other handles share it (copy-on-write).
    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8]> {
        let nbytes = self.nbytes();
        let (numel, dtype, device) = (self.numel, self.dtype, self.device);
        match Arc::make_mut(&mut self.data) {
            StorageData::Cpu(words) => Ok(&mut bytemuck::cast_slice_mut::<u64, u8>(words)[..nbytes]),
            StorageData::Remote => Err(ArithError::InaccessibleData(format!(
                "storage of {numel} {dtype} elements on {device}"
            ))),
        }
    }

    /// Interpret storage as a slice of f32 values.
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        if self.dtype != DType::F32 {
            return None;
        }
        bytemuck::try_cast_slice(self.as_bytes().ok()?).ok()
    }

    /// Whether two handles point at the same buffer.
    pub fn shares_buffer(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

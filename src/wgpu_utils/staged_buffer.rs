//! Resident uniform buffers fed through a ring of CPU-writable staging buffers
//!
//! Each frame a value is written into a mapped staging slot (`stage`), copied
//! into the resident buffer by the frame's command encoder (`encode`), and the
//! slot is handed back for re-mapping once the frame has been submitted
//! (`reclaim`). A slot that has not finished re-mapping when its turn comes
//! around again is replaced by a freshly mapped allocation.
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Staging slots per buffer when no other count is configured.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 3;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Mapped and writable.
    Ready = 0,
    /// Written and unmapped, waiting for its copy to be encoded.
    Staged = 1,
    /// Copy recorded (or superseded); needs re-mapping after submit.
    Spent = 2,
    /// `map_async` requested, waiting on the device.
    Mapping = 3,
    /// Mapping failed; the slot gets reallocated on next use.
    Lost = 4,
}

impl SlotState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SlotState::Ready,
            1 => SlotState::Staged,
            2 => SlotState::Spent,
            3 => SlotState::Mapping,
            _ => SlotState::Lost,
        }
    }
}

/// Slot state shared with the `map_async` callback.
#[derive(Debug, Clone)]
pub struct SlotFlag(Arc<AtomicU8>);

impl SlotFlag {
    fn new(state: SlotState) -> Self {
        SlotFlag(Arc::new(AtomicU8::new(state as u8)))
    }

    pub fn get(&self) -> SlotState {
        SlotState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: SlotState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Outcome of asking the ring for the next slot to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// Slot is mapped and can be written directly.
    Mapped(usize),
    /// Slot is still busy; the caller must put a fresh buffer in its place.
    Replace(usize),
}

/// Round-robin bookkeeping for the staging slots, independent of the device.
#[derive(Debug)]
pub struct StagingRing {
    flags: Vec<SlotFlag>,
    cursor: usize,
    staged: Option<usize>,
}

impl StagingRing {
    pub fn new(len: usize) -> Self {
        let len = len.max(1);
        StagingRing {
            flags: (0..len).map(|_| SlotFlag::new(SlotState::Ready)).collect(),
            cursor: 0,
            staged: None,
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn state(&self, index: usize) -> SlotState {
        self.flags[index].get()
    }

    /// Picks the next slot. A value staged earlier but never encoded is
    /// superseded and its slot queued for reclaim.
    pub fn acquire(&mut self) -> Acquired {
        if let Some(previous) = self.staged.take() {
            self.flags[previous].set(SlotState::Spent);
        }
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.flags.len();
        match self.flags[index].get() {
            SlotState::Ready => Acquired::Mapped(index),
            _ => Acquired::Replace(index),
        }
    }

    /// Detaches the slot from any in-flight callback and marks it ready.
    pub fn replace(&mut self, index: usize) {
        self.flags[index] = SlotFlag::new(SlotState::Ready);
    }

    pub fn mark_staged(&mut self, index: usize) {
        self.flags[index].set(SlotState::Staged);
        self.staged = Some(index);
    }

    /// Slot whose copy should be recorded now, if anything was staged.
    pub fn take_staged(&mut self) -> Option<usize> {
        let index = self.staged.take()?;
        self.flags[index].set(SlotState::Spent);
        Some(index)
    }

    /// Moves every spent slot to `Mapping` and returns the flags the mapping
    /// callbacks should report into.
    pub fn begin_reclaim(&mut self) -> Vec<(usize, SlotFlag)> {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, flag)| flag.get() == SlotState::Spent)
            .map(|(index, flag)| {
                flag.set(SlotState::Mapping);
                (index, flag.clone())
            })
            .collect()
    }
}

/// One resident `UNIFORM | COPY_DST` buffer plus its staging ring.
pub struct StagedBuffer {
    label: String,
    size: u64,
    resident: wgpu::Buffer,
    slots: Vec<wgpu::Buffer>,
    ring: StagingRing,
    reallocations: usize,
}

impl StagedBuffer {
    pub fn new(device: &wgpu::Device, label: &str, size: u64, frames_in_flight: usize) -> Self {
        let size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let resident = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            // COPY_SRC for readback
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let ring = StagingRing::new(frames_in_flight);
        let slots = (0..ring.len())
            .map(|index| Self::staging_slot(device, label, size, index))
            .collect();

        StagedBuffer {
            label: label.to_owned(),
            size,
            resident,
            slots,
            ring,
            reallocations: 0,
        }
    }

    fn staging_slot(device: &wgpu::Device, label: &str, size: u64, index: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} staging[{index}]")),
            size,
            usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        })
    }

    /// Writes `bytes` into the next staging slot.
    pub fn stage(&mut self, device: &wgpu::Device, bytes: &[u8]) {
        debug_assert!(
            bytes.len() as u64 <= self.size,
            "{} bytes staged into {}-byte buffer {}",
            bytes.len(),
            self.size,
            self.label
        );
        let index = match self.ring.acquire() {
            Acquired::Mapped(index) => index,
            Acquired::Replace(index) => {
                log::trace!(
                    "{}: staging slot {} not reclaimed yet, allocating a replacement",
                    self.label,
                    index
                );
                self.slots[index] = Self::staging_slot(device, &self.label, self.size, index);
                self.ring.replace(index);
                self.reallocations += 1;
                index
            }
        };

        let slot = &self.slots[index];
        {
            let mut view = slot.slice(..).get_mapped_range_mut();
            let len = bytes.len().min(view.len());
            view[..len].copy_from_slice(&bytes[..len]);
        }
        slot.unmap();
        self.ring.mark_staged(index);
    }

    /// Records the staging-to-resident copy. Returns false when nothing was staged.
    pub fn encode(&mut self, encoder: &mut wgpu::CommandEncoder) -> bool {
        match self.ring.take_staged() {
            Some(index) => {
                encoder.copy_buffer_to_buffer(&self.slots[index], 0, &self.resident, 0, self.size);
                true
            }
            None => false,
        }
    }

    /// Re-maps spent slots. Only valid once the frame that used them was submitted.
    pub fn reclaim(&mut self) {
        for (index, flag) in self.ring.begin_reclaim() {
            self.slots[index]
                .slice(..)
                .map_async(wgpu::MapMode::Write, move |result| {
                    flag.set(match result {
                        Ok(()) => SlotState::Ready,
                        Err(_) => SlotState::Lost,
                    });
                });
        }
    }

    pub fn resident(&self) -> &wgpu::Buffer {
        &self.resident
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.resident.as_entire_binding()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of times a busy slot had to be replaced.
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }
}

/// Typed view over a [`StagedBuffer`] holding exactly one `Content`.
pub struct StagedUniform<Content> {
    inner: StagedBuffer,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> StagedUniform<Content> {
    fn name() -> &'static str {
        let type_name = std::any::type_name::<Content>();
        match type_name.rfind(':') {
            Some(pos) => &type_name[(pos + 1)..],
            None => type_name,
        }
    }

    pub fn new(device: &wgpu::Device, label: &str, frames_in_flight: usize) -> Self {
        StagedUniform {
            inner: StagedBuffer::new(
                device,
                &format!("{label}: {}", Self::name()),
                std::mem::size_of::<Content>() as u64,
                frames_in_flight,
            ),
            content_type: PhantomData,
        }
    }

    pub fn stage(&mut self, device: &wgpu::Device, content: &Content) {
        self.inner.stage(device, bytemuck::bytes_of(content));
    }

    pub fn encode(&mut self, encoder: &mut wgpu::CommandEncoder) -> bool {
        self.inner.encode(encoder)
    }

    pub fn reclaim(&mut self) {
        self.inner.reclaim();
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.inner.binding_resource()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        self.inner.resident()
    }

    pub fn reallocations(&self) -> usize {
        self.inner.reallocations()
    }
}

use once_cell::sync::OnceCell;
use visicull_types::DrawCommand;

use crate::{CullingError, VisibleCounter};

/// Pre-allocated, write-once output of a culling pass.
///
/// Workers [`push`](Self::push) concurrently through a shared reference. Every
/// push reserves a distinct slot from the [`VisibleCounter`], so the written
/// commands always form the gapless prefix `[0, len)`. Reading the prefix back
/// out and clearing for the next frame need exclusive access, so they cannot
/// overlap a running pass.
#[derive(Debug)]
pub struct CommandBuffer {
    slots: Box<[OnceCell<DrawCommand>]>,
    counter: VisibleCounter,
}

impl CommandBuffer {
    pub fn new(capacity: usize) -> Result<Self, CullingError> {
        let counter_capacity =
            u32::try_from(capacity).map_err(|_| CullingError::CapacityOverflow { requested: capacity })?;

        log::debug!("Allocating command buffer with {} slots", capacity);

        Ok(Self {
            slots: (0..capacity).map(|_| OnceCell::new()).collect(),
            counter: VisibleCounter::new(counter_capacity),
        })
    }

    /// Reserves the next slot and writes `command` into it.
    ///
    /// Returns the slot, or `None` if the buffer is full, in which case nothing
    /// is written and the counter is left at capacity.
    pub fn push(&self, command: DrawCommand) -> Option<u32> {
        let slot = self.counter.reserve()?;
        let written = self.slots[slot as usize].set(command);
        debug_assert!(written.is_ok(), "slot {slot} handed out twice");
        Some(slot)
    }

    /// Command in `slot`, if it has been written yet.
    pub fn get(&self, slot: u32) -> Option<&DrawCommand> {
        self.slots.get(slot as usize)?.get()
    }

    /// Number of reserved slots. Equal to the visible counter.
    pub fn len(&self) -> usize {
        self.counter.get() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn counter(&self) -> &VisibleCounter {
        &self.counter
    }

    /// Number of slots holding a command, counted over the whole buffer.
    pub fn written(&mut self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    /// The written commands, in slot order.
    pub fn commands(&mut self) -> Vec<DrawCommand> {
        let len = self.len();
        self.slots[..len].iter_mut().filter_map(|slot| slot.get_mut().copied()).collect()
    }

    pub fn into_commands(mut self) -> Vec<DrawCommand> {
        self.commands()
    }

    /// Resets the counter and empties every written slot.
    pub fn clear(&mut self) {
        let len = self.len();
        for slot in &mut self.slots[..len] {
            slot.take();
        }
        self.counter.reset();
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use visicull_types::DrawCommand;

    use super::CommandBuffer;

    fn command(object: u32) -> DrawCommand {
        DrawCommand {
            index_count: 6,
            instance_count: 1,
            first_index: object * 6,
            vertex_offset: 0,
            first_instance: object,
        }
    }

    #[test]
    fn push_fills_prefix() {
        let mut buffer = CommandBuffer::new(4).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.push(command(7)), Some(0));
        assert_eq!(buffer.push(command(3)), Some(1));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(1), Some(&command(3)));
        assert_eq!(buffer.get(2), None);
        assert_eq!(buffer.get(100), None);
        assert_eq!(buffer.commands(), vec![command(7), command(3)]);
        assert_eq!(buffer.written(), 2);
    }

    #[test]
    fn full_buffer_drops() {
        let mut buffer = CommandBuffer::new(2).unwrap();
        assert_eq!(buffer.push(command(0)), Some(0));
        assert_eq!(buffer.push(command(1)), Some(1));
        assert_eq!(buffer.push(command(2)), None);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.counter().get(), 2);
        assert_eq!(buffer.written(), 2);
        assert_eq!(buffer.into_commands(), vec![command(0), command(1)]);
    }

    #[test]
    fn clear_allows_reuse() {
        let mut buffer = CommandBuffer::new(2).unwrap();
        buffer.push(command(0));
        buffer.push(command(1));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.written(), 0);
        assert_eq!(buffer.push(command(5)), Some(0));
        assert_eq!(buffer.commands(), vec![command(5)]);
    }

    #[test]
    fn empty_buffer() {
        let mut buffer = CommandBuffer::new(0).unwrap();
        assert_eq!(buffer.push(command(0)), None);
        assert!(buffer.commands().is_empty());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn capacity_must_fit_counter() {
        let result = CommandBuffer::new(u32::MAX as usize + 1);
        assert!(matches!(
            result,
            Err(crate::CullingError::CapacityOverflow { requested }) if requested == u32::MAX as usize + 1
        ));
    }
}

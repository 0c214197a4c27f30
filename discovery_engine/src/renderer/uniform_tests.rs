//! Unit tests for uniform.rs

use crate::error::Error;
use crate::renderer::buffer::Buffer;
use crate::renderer::mock_renderer::MockBuffer;
use crate::renderer::uniform::UniformSlots;
use glam::Mat4;

fn slots(count: usize, size: u64) -> Vec<MockBuffer> {
    (0..count).map(|_| MockBuffer::new(size)).collect()
}

#[test]
fn test_write_then_read_back_is_exact() {
    let mut uniform = UniformSlots::new(Mat4::IDENTITY, slots(3, 64)).unwrap();
    let value = Mat4::from_cols_array(&[
        1.5, 0.0, 0.0, 0.0,
        0.0, -2.25, 0.0, 0.0,
        0.0, 0.0, 3.125, 0.0,
        7.0, 8.0, 9.0, 1.0,
    ]);

    uniform.set(value);
    uniform.write_slot(1).unwrap();

    assert_eq!(uniform.read_slot(1).unwrap(), value);
}

#[test]
fn test_write_touches_only_target_slot() {
    let mut uniform = UniformSlots::new(0u32, slots(3, 4)).unwrap();

    uniform.set(0xDEAD_BEEF);
    uniform.write_slot(2).unwrap();

    assert_eq!(uniform.read_slot(0).unwrap(), 0);
    assert_eq!(uniform.read_slot(1).unwrap(), 0);
    assert_eq!(uniform.read_slot(2).unwrap(), 0xDEAD_BEEF);
    assert_eq!(uniform.slots()[0].read_back(0, 4).unwrap(), vec![0, 0, 0, 0]);
}

#[test]
fn test_set_does_not_write() {
    let mut uniform = UniformSlots::new(1.0f32, slots(2, 4)).unwrap();
    uniform.set(2.0);

    assert_eq!(*uniform.value(), 2.0);
    assert_eq!(uniform.read_slot(0).unwrap(), 0.0);
}

#[test]
fn test_out_of_range_image_index() {
    let uniform = UniformSlots::new(0u32, slots(2, 4)).unwrap();
    assert_eq!(uniform.slot_count(), 2);
    assert!(matches!(uniform.write_slot(2), Err(Error::InvalidResource(_))));
    assert!(matches!(uniform.read_slot(5), Err(Error::InvalidResource(_))));
}

#[test]
fn test_undersized_slot_rejected() {
    let result = UniformSlots::new(Mat4::IDENTITY, vec![MockBuffer::new(64), MockBuffer::new(32)]);
    assert!(matches!(result, Err(Error::InvalidResource(msg)) if msg.contains("slot 1")));
}

/// Mock backend for unit tests (no GPU required)
///
/// These mocks let the registry, frame pacer, uniform slots and scene recorder
/// be tested without a real graphics backend. Every mock records what happened
/// to it as plain strings so tests can assert on exact call sequences.

use std::cell::{Cell, RefCell};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::engine_bail;
use crate::log::{Logger, LogEntry};
use crate::renderer::{
    Buffer, ClearValue, CommandList, FrameSync, Rect2D, SwapchainHost, SwapchainResource,
    SwapchainStatus, Viewport,
};
use crate::renderer::buffer::check_range;

// ============================================================================
// Capturing Logger
// ============================================================================

/// Logger that stores every entry
pub struct CapturingLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CapturingLogger {
    pub fn new() -> Self {
        Self { entries: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Shared handle to the captured entries
    pub fn entries(&self) -> Arc<Mutex<Vec<LogEntry>>> {
        self.entries.clone()
    }
}

impl Logger for CapturingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

/// Host-memory buffer
#[derive(Debug)]
pub struct MockBuffer {
    memory: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(size: u64) -> Self {
        Self { memory: Mutex::new(vec![0; size as usize]) }
    }
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut memory = self.memory.lock().unwrap();
        check_range(memory.len() as u64, offset, data.len() as u64)?;
        let start = offset as usize;
        memory[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.memory.lock().unwrap().len() as u64
    }

    fn read_back(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let memory = self.memory.lock().unwrap();
        check_range(memory.len() as u64, offset, len)?;
        Ok(memory[offset as usize..(offset + len) as usize].to_vec())
    }
}

// ============================================================================
// Mock Command List
// ============================================================================

/// Pipeline handle understood by the mock command list
#[derive(Debug)]
pub struct MockPipeline {
    pub name: String,
}

/// Descriptor group handle understood by the mock command list
#[derive(Debug)]
pub struct MockGroup {
    pub label: String,
}

/// Command list that records command names
#[derive(Debug, Default)]
pub struct MockCommandList {
    pub commands: Vec<String>,
    recording: bool,
    fail_at: Option<usize>,
}

impl MockCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command list whose `index`-th command fails
    pub fn failing_at(index: usize) -> Self {
        Self { fail_at: Some(index), ..Self::default() }
    }

    fn push(&mut self, command: String) -> Result<()> {
        if self.fail_at == Some(self.commands.len()) {
            engine_bail!("discovery::mock", "injected failure at {}", command);
        }
        self.commands.push(command);
        Ok(())
    }

    /// Recorded draw commands only
    pub fn draws(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|c| c.starts_with("draw"))
            .map(|c| c.as_str())
            .collect()
    }
}

impl CommandList for MockCommandList {
    type Pipeline = MockPipeline;
    type Group = Arc<MockGroup>;
    type Buffer = MockBuffer;

    fn begin(&mut self) -> Result<()> {
        if self.recording {
            engine_bail!("discovery::mock", "Command list is already recording");
        }
        self.recording = true;
        self.push("begin".to_string())
    }

    fn end(&mut self) -> Result<()> {
        self.recording = false;
        self.push("end".to_string())
    }

    fn begin_render_pass(&mut self, clear_values: &[ClearValue]) -> Result<()> {
        self.push(format!("begin_render_pass clears={}", clear_values.len()))
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push("end_render_pass".to_string())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.push(format!("set_viewport {}x{}", viewport.width, viewport.height))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.push(format!("set_scissor {}x{}", scissor.width, scissor.height))
    }

    fn bind_pipeline(&mut self, pipeline: &MockPipeline) -> Result<()> {
        self.push(format!("bind_pipeline {}", pipeline.name))
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &MockPipeline,
        set_index: u32,
        group: &Arc<MockGroup>,
    ) -> Result<()> {
        self.push(format!("bind_group {} {}", set_index, group.label))
    }

    fn bind_vertex_buffer(&mut self, _buffer: &MockBuffer, offset: u64) -> Result<()> {
        self.push(format!("bind_vertex_buffer {}", offset))
    }

    fn bind_index_buffer(&mut self, _buffer: &MockBuffer, offset: u64) -> Result<()> {
        self.push(format!("bind_index_buffer {}", offset))
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.push(format!("draw {} {}", vertex_count, first_vertex))
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.push(format!("draw_indexed {} {} {}", index_count, first_index, vertex_offset))
    }
}

// ============================================================================
// Mock Frame Sync
// ============================================================================

/// Simulated fences and swapchain
///
/// A frame slot is "in flight" from `submit` until its fence is waited on.
/// Resetting or submitting a slot that is still in flight panics, which is
/// exactly the misuse the pacer must prevent.
pub struct MockFrameSync {
    pub image_count: Cell<u32>,
    next_image: Cell<u32>,
    in_flight: RefCell<Vec<usize>>,
    pub max_in_flight: Cell<usize>,
    pub events: RefCell<Vec<String>>,
    /// Next acquire reports `OutOfDate`
    pub out_of_date_next: Cell<bool>,
    /// Status returned by the next present
    pub present_status: Cell<SwapchainStatus>,
}

impl MockFrameSync {
    pub fn new(image_count: u32) -> Self {
        Self {
            image_count: Cell::new(image_count),
            next_image: Cell::new(0),
            in_flight: RefCell::new(Vec::new()),
            max_in_flight: Cell::new(0),
            events: RefCell::new(Vec::new()),
            out_of_date_next: Cell::new(false),
            present_status: Cell::new(SwapchainStatus::Optimal),
        }
    }

    /// Simulate a rebuilt swapchain with `image_count` images
    pub fn rebuild(&self, image_count: u32) {
        self.image_count.set(image_count);
        self.next_image.set(0);
    }

    pub fn in_flight(&self) -> Vec<usize> {
        self.in_flight.borrow().clone()
    }
}

impl FrameSync for MockFrameSync {
    type Commands = str;

    fn wait_for_fence(&self, frame: usize) -> Result<()> {
        self.in_flight.borrow_mut().retain(|f| *f != frame);
        self.events.borrow_mut().push(format!("wait {}", frame));
        Ok(())
    }

    fn reset_fence(&self, frame: usize) -> Result<()> {
        assert!(
            !self.in_flight.borrow().contains(&frame),
            "fence {} reset while its frame is still in flight",
            frame
        );
        self.events.borrow_mut().push(format!("reset {}", frame));
        Ok(())
    }

    fn acquire_image(&self, frame: usize) -> Result<(u32, SwapchainStatus)> {
        if self.out_of_date_next.replace(false) {
            self.events.borrow_mut().push(format!("acquire {} out_of_date", frame));
            return Ok((0, SwapchainStatus::OutOfDate));
        }
        let image = self.next_image.get();
        self.next_image.set((image + 1) % self.image_count.get());
        self.events.borrow_mut().push(format!("acquire {} -> {}", frame, image));
        Ok((image, SwapchainStatus::Optimal))
    }

    fn submit(&self, frame: usize, image_index: u32, commands: &str) -> Result<()> {
        let mut in_flight = self.in_flight.borrow_mut();
        assert!(!in_flight.contains(&frame), "frame slot {} reused while in flight", frame);
        in_flight.push(frame);
        self.max_in_flight.set(self.max_in_flight.get().max(in_flight.len()));
        self.events
            .borrow_mut()
            .push(format!("submit {} {} {}", frame, image_index, commands));
        Ok(())
    }

    fn present(&self, frame: usize, image_index: u32) -> Result<SwapchainStatus> {
        self.events.borrow_mut().push(format!("present {} {}", frame, image_index));
        Ok(self.present_status.replace(SwapchainStatus::Optimal))
    }
}

// ============================================================================
// Mock Swapchain Host + Resources
// ============================================================================

/// Swapchain owner that logs the recreation protocol
pub struct MockHost {
    pub extent: (u32, u32),
    pub image_count: u32,
    /// Incremented on every swapchain build
    pub generation: u32,
    pub built: bool,
    pub events: RefCell<Vec<String>>,
    /// Fail the next `build_swapchain`
    pub fail_build: bool,
}

impl MockHost {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            extent: (width, height),
            image_count: Self::image_count_for(width, height),
            generation: 1,
            built: true,
            events: RefCell::new(Vec::new()),
            fail_build: false,
        }
    }

    /// Larger surfaces get one more image, so tests can see the count change
    fn image_count_for(width: u32, _height: u32) -> u32 {
        if width > 800 { 4 } else { 3 }
    }

    pub fn take_events(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl SwapchainHost for MockHost {
    fn wait_idle(&self) -> Result<()> {
        self.events.borrow_mut().push("wait_idle".to_string());
        Ok(())
    }

    fn teardown_swapchain(&mut self) {
        self.built = false;
        self.events.borrow_mut().push("teardown_swapchain".to_string());
    }

    fn build_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        if self.fail_build {
            engine_bail!("discovery::mock", "swapchain build failed");
        }
        self.extent = (width, height);
        self.image_count = Self::image_count_for(width, height);
        self.generation += 1;
        self.built = true;
        self.events
            .borrow_mut()
            .push(format!("build_swapchain {}x{}", width, height));
        Ok(())
    }
}

/// Kind of mock registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockKind {
    Pipeline,
    Recorder,
}

/// Pipeline or recorder stand-in
///
/// A pipeline holds one native "handle" (the swapchain generation it was built
/// against); a recorder holds one command buffer per swapchain image.
pub struct MockResource {
    pub name: String,
    pub kind: MockKind,
    pub handle: Option<u32>,
    pub command_buffers: Vec<u32>,
}

impl MockResource {
    pub fn new(name: &str, kind: MockKind, host: &MockHost) -> Self {
        let mut resource = Self {
            name: name.to_string(),
            kind,
            handle: None,
            command_buffers: Vec::new(),
        };
        resource.build(host);
        resource
    }

    pub fn shared(name: &str, kind: MockKind, host: &MockHost) -> Arc<Mutex<MockResource>> {
        Arc::new(Mutex::new(Self::new(name, kind, host)))
    }

    fn build(&mut self, host: &MockHost) {
        match self.kind {
            MockKind::Pipeline => self.handle = Some(host.generation),
            MockKind::Recorder => {
                self.command_buffers = (0..host.image_count).map(|_| host.generation).collect();
            }
        }
    }
}

impl SwapchainResource<MockHost> for MockResource {
    fn release(&mut self, host: &MockHost) {
        self.handle = None;
        self.command_buffers.clear();
        host.events.borrow_mut().push(format!("release {}", self.name));
    }

    fn rebuild(&mut self, host: &MockHost) -> Result<()> {
        assert!(host.built, "{} rebuilt before the swapchain", self.name);
        self.build(host);
        host.events.borrow_mut().push(format!("rebuild {}", self.name));
        Ok(())
    }
}

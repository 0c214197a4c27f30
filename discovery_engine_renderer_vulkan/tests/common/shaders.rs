//! Precompiled SPIR-V used by the GPU tests
//!
//! Vertex stage:
//!
//! ```glsl
//! #version 450
//! layout(location = 0) in vec3 position;
//! void main() { gl_Position = vec4(position, 1.0); }
//! ```
//!
//! Fragment stage:
//!
//! ```glsl
//! #version 450
//! layout(location = 0) out vec4 color;
//! void main() { color = vec4(1.0); }
//! ```

pub const VERTEX_SPIRV: &[u32] = &[
    0x07230203, 0x00010000, 0x00000000, 0x00000012, 0x00000000, 0x00020011,
    0x00000001, 0x0003000e, 0x00000000, 0x00000001, 0x0007000f, 0x00000000,
    0x00000001, 0x6e69616d, 0x00000000, 0x00000002, 0x00000003, 0x00040047,
    0x00000002, 0x0000001e, 0x00000000, 0x00040047, 0x00000003, 0x0000000b,
    0x00000000, 0x00020013, 0x00000004, 0x00030021, 0x00000005, 0x00000004,
    0x00030016, 0x00000006, 0x00000020, 0x00040017, 0x00000007, 0x00000006,
    0x00000003, 0x00040017, 0x00000008, 0x00000006, 0x00000004, 0x00040020,
    0x00000009, 0x00000001, 0x00000007, 0x00040020, 0x0000000a, 0x00000003,
    0x00000008, 0x0004003b, 0x00000009, 0x00000002, 0x00000001, 0x0004003b,
    0x0000000a, 0x00000003, 0x00000003, 0x0004002b, 0x00000006, 0x0000000b,
    0x3f800000, 0x00050036, 0x00000004, 0x00000001, 0x00000000, 0x00000005,
    0x000200f8, 0x0000000c, 0x0004003d, 0x00000007, 0x0000000d, 0x00000002,
    0x00050051, 0x00000006, 0x0000000e, 0x0000000d, 0x00000000, 0x00050051,
    0x00000006, 0x0000000f, 0x0000000d, 0x00000001, 0x00050051, 0x00000006,
    0x00000010, 0x0000000d, 0x00000002, 0x00070050, 0x00000008, 0x00000011,
    0x0000000e, 0x0000000f, 0x00000010, 0x0000000b, 0x0003003e, 0x00000003,
    0x00000011, 0x000100fd, 0x00010038,
];

pub const FRAGMENT_SPIRV: &[u32] = &[
    0x07230203, 0x00010000, 0x00000000, 0x0000000b, 0x00000000, 0x00020011,
    0x00000001, 0x0003000e, 0x00000000, 0x00000001, 0x0006000f, 0x00000004,
    0x00000001, 0x6e69616d, 0x00000000, 0x00000002, 0x00030010, 0x00000001,
    0x00000007, 0x00040047, 0x00000002, 0x0000001e, 0x00000000, 0x00020013,
    0x00000003, 0x00030021, 0x00000004, 0x00000003, 0x00030016, 0x00000005,
    0x00000020, 0x00040017, 0x00000006, 0x00000005, 0x00000004, 0x00040020,
    0x00000007, 0x00000003, 0x00000006, 0x0004003b, 0x00000007, 0x00000002,
    0x00000003, 0x0004002b, 0x00000005, 0x00000008, 0x3f800000, 0x0007002c,
    0x00000006, 0x00000009, 0x00000008, 0x00000008, 0x00000008, 0x00000008,
    0x00050036, 0x00000003, 0x00000001, 0x00000000, 0x00000004, 0x000200f8,
    0x0000000a, 0x0003003e, 0x00000002, 0x00000009, 0x000100fd, 0x00010038,
];

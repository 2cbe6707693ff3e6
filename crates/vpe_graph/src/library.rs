// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.
//!
//! `Comment` is always available. The `Image.*` types are a small demo
//! library; the engine never executes them.

use crate::geometry::Size;
use crate::registry::{Appearance, TypeDescriptor, TypeRegistry};
use crate::slot::SlotDecl;
use serde_json::Value;

/// Type name of the built-in comment node
pub const COMMENT_TYPE: &str = "Comment";

/// Initial comment size
pub const COMMENT_DEFAULT_SIZE: Size = Size::new(200.0, 200.0);

const IMAGE: &str = "numpy.ndarray";

/// Register the comment type
pub fn register_comment(registry: &mut TypeRegistry) {
    let descriptor = TypeDescriptor::new(COMMENT_TYPE, "Comment")
        .comment(COMMENT_DEFAULT_SIZE)
        .with_property("text", Value::from("Comment"));
    if let Err(err) = registry.register(descriptor) {
        tracing::error!("Built-in comment type rejected: {err}");
    }
}

/// Register the image demo library
pub fn register_image_types(registry: &mut TypeRegistry) {
    let types = [
        TypeDescriptor::new("Image.Read", "Read Image")
            .with_input(SlotDecl::exec("in_exec"))
            .with_input(SlotDecl::data("path", "string").with_default(Value::from("")))
            .with_output(SlotDecl::exec("out_exec"))
            .with_output(SlotDecl::data("image", IMAGE)),
        TypeDescriptor::new("Image.Write", "Write Image")
            .with_input(SlotDecl::exec("in_exec"))
            .with_input(SlotDecl::data("image", IMAGE))
            .with_input(SlotDecl::data("path", "string").with_default(Value::from("")))
            .with_output(SlotDecl::exec("out_exec")),
        TypeDescriptor::new("Image.Show", "Show Image")
            .with_input(SlotDecl::exec("in_exec"))
            .with_input(SlotDecl::data("image", IMAGE))
            .with_output(SlotDecl::exec("out_exec")),
        TypeDescriptor::new("Image.GaussianFilter", "Gaussian Filter")
            .with_input(SlotDecl::exec("in_exec"))
            .with_input(SlotDecl::data("input", IMAGE))
            .with_input(SlotDecl::data("sigma", "number").with_default(Value::from(1.0)))
            .with_output(SlotDecl::exec("out_exec"))
            .with_output(SlotDecl::data("image", IMAGE)),
        TypeDescriptor::new("Image.ImagePlusImage", "Image + Image")
            .with_input(SlotDecl::data("imageA", IMAGE))
            .with_input(SlotDecl::data("imageB", IMAGE))
            .with_output(SlotDecl::data("image", IMAGE))
            .with_appearance(Appearance {
                title_bar: false,
                central_text: Some("+".to_string()),
                ..Appearance::default()
            }),
        TypeDescriptor::new("Image.Image", "Image")
            .with_output(SlotDecl::data("image", IMAGE))
            .with_appearance(Appearance {
                title_bar: false,
                ..Appearance::default()
            }),
    ];

    for descriptor in types {
        if let Err(err) = registry.register(descriptor) {
            tracing::error!("Built-in image type rejected: {err}");
        }
    }
}

/// Registry with every built-in type
pub fn create_builtin_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    register_comment(&mut registry);
    register_image_types(&mut registry);
    registry
}

//! Turning log events into outbound records.
//!
//! `fields` and `resolver` derive the semantic fields, `items` parses the
//! multi-value ones, `formatter` stringifies property values, `layout` renders
//! templates and `assembler` puts a record together.

pub mod assembler;
pub mod fields;
pub mod formatter;
pub mod items;
pub mod layout;
pub mod resolver;

pub use assembler::MessageAssembler;
pub use fields::{FieldName, FieldSource, HostValue};
pub use formatter::format_value;
pub use items::render_items;
pub use layout::{Layout, LayoutError, TemplateRenderer, render_message_template};
pub use resolver::{FieldResolver, HostEnvironment, NoHost, ProcessHost, Resolution, machine_name};

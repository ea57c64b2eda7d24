//! Static HTML dashboard rendering.
//!
//! One page per license target plus an index. Every page carries a
//! `<meta http-equiv="refresh">` directive and a "Last updated" stamp, so a
//! browser left open follows the scheduler without any server component.

mod escape;
mod page;
mod writer;

pub use escape::{escape_html, page_file_name};
pub use page::{render_index, render_license_page, PageContent, RenderSettings};
pub use writer::OutputWriter;

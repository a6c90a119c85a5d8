//! Scenes on a GPU without a window.
//!
//! Useful for integration tests, batch processing and servers that keep
//! objects synchronized without presenting them.

use pollster::FutureExt;
use volscope_core::{Options, Result};
use volscope_render::WgpuBackend;

use crate::scene::Scene;

/// Creates a scene on a new headless wgpu device.
///
/// Fails if no adapter is available, which is common on CI machines.
///
/// # Example
/// ```no_run
/// use volscope::*;
///
/// let mut scene = headless_scene(Options::default()).unwrap();
/// scene.prepare_frame().unwrap();
/// ```
pub fn headless_scene(options: Options) -> Result<Scene<WgpuBackend>> {
    let backend = WgpuBackend::new_headless().block_on()?;
    Ok(Scene::new(backend, options))
}

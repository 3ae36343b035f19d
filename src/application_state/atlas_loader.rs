//! Loads the block atlas off the event loop.
//!
//! Native builds read the file on a background thread, web builds fetch it from
//! the page origin. Either way the result arrives as an `EngineEvent`.

use log::error;
use winit::event_loop::EventLoopProxy;

use crate::engine_state::rendering::atlas::{AtlasImage, ATLAS_PATH};

use super::EngineEvent;

/// Starts loading the atlas and reports the result through `event_loop_proxy`.
pub fn spawn_atlas_load(event_loop_proxy: EventLoopProxy<EngineEvent>) {
    #[cfg(not(target_family = "wasm"))]
    {
        let spawned = std::thread::Builder::new()
            .name("atlas-loader".to_owned())
            .spawn(move || send_atlas(&event_loop_proxy, read_atlas(ATLAS_PATH)));
        if let Err(err) = spawned {
            error!("Failed to start atlas loader: {err}");
        }
    }

    #[cfg(target_family = "wasm")]
    wasm_bindgen_futures::spawn_local(async move {
        send_atlas(&event_loop_proxy, fetch_atlas().await);
    });
}

fn send_atlas(event_loop_proxy: &EventLoopProxy<EngineEvent>, atlas: anyhow::Result<AtlasImage>) {
    let event = match atlas {
        Ok(atlas) => EngineEvent::AtlasLoaded(atlas),
        Err(err) => EngineEvent::AtlasFailed(err),
    };
    if event_loop_proxy.send_event(event).is_err() {
        error!("Event loop closed before the atlas was delivered");
    }
}

#[cfg(not(target_family = "wasm"))]
fn read_atlas(path: &str) -> anyhow::Result<AtlasImage> {
    use anyhow::Context;

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read atlas at {path}"))?;
    AtlasImage::decode_png(&bytes)
}

#[cfg(target_family = "wasm")]
async fn fetch_atlas() -> anyhow::Result<AtlasImage> {
    use anyhow::anyhow;

    let origin = web_sys::window()
        .ok_or_else(|| anyhow!("No browser window"))?
        .location()
        .origin()
        .map_err(|err| anyhow!("Failed to read page origin: {err:?}"))?;
    let url = format!("{origin}/{ATLAS_PATH}");

    let bytes = reqwest::get(&url)
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    AtlasImage::decode_png(&bytes)
}

#[cfg(all(test, not(target_family = "wasm")))]
mod tests {
    use super::*;

    #[test]
    fn missing_atlas_is_an_error() {
        let err = read_atlas("assets/textures/does-not-exist.png").unwrap_err();
        assert!(format!("{err:#}").contains("does-not-exist.png"));
    }

    #[test]
    fn bundled_atlas_splits_into_tiles() {
        let atlas = read_atlas(ATLAS_PATH).unwrap();
        assert_eq!(atlas.width % 4, 0);
        assert_eq!(atlas.rgba.len(), (atlas.width * atlas.height * 4) as usize);
    }
}

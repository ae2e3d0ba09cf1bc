//! Gesture handling for a screen-reader style UI.
//!
//! - `tap`: one tap speaks an element, two taps activate it
//! - `volume`: double taps on the left/right screen edges change the volume

mod tap;
mod volume;

pub use tap::{PendingState, TapDisambiguator, TapEvent, DEFAULT_DOUBLE_TAP_WINDOW};
pub use volume::{EdgeZone, EdgeZoneLayout, EdgeZoneVolumeController, VolumeOutcome, VOLUME_STEP};

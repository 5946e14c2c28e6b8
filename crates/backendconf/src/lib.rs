//! # backendconf
//!
//! Parser and rewriter for the INI-like configuration snippets users attach
//! to a volume service.
//!
//! The snippet format is a plain oslo.config file:
//! ```text
//! [DEFAULT]
//! debug = true
//!
//! [lvm]
//! volume_backend_name = lvm
//! volume_driver = cinder.volume.drivers.lvm.LVMVolumeDriver
//! ```
//!
//! The augmenter derives two facts from such a snippet:
//! - the list of backends it declares, injected as `enabled_backends` under
//!   `[DEFAULT]` when the user did not set it explicitly
//! - whether any backend relies on the fallback (LVM) driver, either
//!   explicitly or by omitting `volume_driver`
//!
//! ## Example
//!
//! ```
//! use backendconf::Augmenter;
//!
//! let snippet = "[lvm]\nvolume_backend_name=lvm";
//! let augmented = Augmenter::default().augment(snippet);
//! assert!(augmented.uses_fallback_driver);
//! assert_eq!(augmented.config, "[DEFAULT]\nenabled_backends=lvm\n[lvm]\nvolume_backend_name=lvm");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod augment;
pub mod parser;

pub use augment::{
    Augmented, Augmenter, BackendScan, DEFAULT_FALLBACK_DRIVER_SUFFIX, enabled_backends_line,
};
pub use parser::{Line, parse_line, parse_string};

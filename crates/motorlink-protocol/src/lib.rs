//! Protocol layer for motorlink motor/encoder peripherals.
//!
//! This crate is I/O-free. It provides the word codec used to turn raw
//! control-transfer payloads into physical quantities, the channel table
//! that describes every readable quantity of a device, and the built-in
//! device profiles.
//!
//! # Key Features
//! - Little-endian word reconstruction and two's-complement decoding
//! - Channel-specific scaling to engineering units
//! - Parameter word packing for `SET_PARAMETER` writes
//! - Declarative device profiles loaded from YAML

#![deny(static_mut_refs)]

pub mod channel;
pub mod codec;
pub mod error;
pub mod ids;
pub mod profile;

pub use channel::{Channel, DecodedSample, Encoding, RequestCode, Scale};
pub use codec::{
    decode_parameter, decode_word, direction_sign, encode_parameter, normalize, scale,
    to_angle_degrees, to_centered_current, to_current, to_signed, to_voltage,
};
pub use error::{ProtocolError, ProtocolResult};
pub use ids::{
    DEFAULT_CONFIGURATION, DEFAULT_INTERFACE, PRODUCT_ID, VENDOR_ID, VENDOR_REQUEST_IN,
    VENDOR_REQUEST_OUT, as5048a,
};
pub use profile::{
    BUILTIN_PROFILES_YAML, DEFAULT_PROFILE, DerivedField, DeviceProfile, ParameterSpec,
    ProfileCatalog, load_builtin_profiles,
};

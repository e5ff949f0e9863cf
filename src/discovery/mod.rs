//! Zeroconf advertisement for the `AirPlay` 2 receiver.
//!
//! This is the Service Advertiser: it publishes `_airplay._tcp` and `_raop._tcp`
//! records describing this receiver and keeps their status TXT entries current as
//! the session lifecycle changes. It does not browse for other devices — a
//! receiver has nothing to discover on the `AirPlay` side; the one thing it does
//! resolve is the downstream DMX controller, which lives in [`crate::dmx`].

pub mod advertiser;

#[cfg(test)]
mod advertiser_tests;
#[cfg(test)]
mod tests {
    mod advertiser_extra;
}

pub use advertiser::{
    AdvertiserConfig, AdvertiserError, AsyncRaopAdvertiser, RaopAdvertiser, ReceiverStatusFlags,
    ServiceAdvertiser, TxtRecordBuilder,
};

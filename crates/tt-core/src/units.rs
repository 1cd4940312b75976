// tt-core/src/units.rs
//
// The plant works in cm³/s; these helpers keep that scale explicit where flows
// leave the engine while storing SI values internally.

use uom::si::f64::VolumeRate as UomVolumeRate;

pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn cm3ps(v: f64) -> VolumeRate {
    use uom::si::volume_rate::cubic_centimeter_per_second;
    VolumeRate::new::<cubic_centimeter_per_second>(v)
}

#[inline]
pub fn in_cm3ps(v: VolumeRate) -> f64 {
    use uom::si::volume_rate::cubic_centimeter_per_second;
    v.get::<cubic_centimeter_per_second>()
}

/// Volume rate in litres per minute, the unit operators read off a flow meter.
#[inline]
pub fn in_lpm(v: VolumeRate) -> f64 {
    use uom::si::volume_rate::liter_per_minute;
    v.get::<liter_per_minute>()
}

// bk-core/src/units.rs

use uom::si::f64::{
    Capacitance as UomCapacitance, ElectricCurrent as UomElectricCurrent,
    ElectricPotential as UomElectricPotential, ElectricalResistance as UomElectricalResistance,
    Frequency as UomFrequency, Inductance as UomInductance, Time as UomTime,
};

// Public canonical unit types (SI, f64)
pub type Capacitance = UomCapacitance;
pub type Current = UomElectricCurrent;
pub type Frequency = UomFrequency;
pub type Inductance = UomInductance;
pub type Resistance = UomElectricalResistance;
pub type Time = UomTime;
pub type Voltage = UomElectricPotential;

#[inline]
pub fn volts(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn amps(v: f64) -> Current {
    use uom::si::electric_current::ampere;
    Current::new::<ampere>(v)
}

#[inline]
pub fn ohms(v: f64) -> Resistance {
    use uom::si::electrical_resistance::ohm;
    Resistance::new::<ohm>(v)
}

#[inline]
pub fn henries(v: f64) -> Inductance {
    use uom::si::inductance::henry;
    Inductance::new::<henry>(v)
}

#[inline]
pub fn farads(v: f64) -> Capacitance {
    use uom::si::capacitance::farad;
    Capacitance::new::<farad>(v)
}

#[inline]
pub fn hz(v: f64) -> Frequency {
    use uom::si::frequency::hertz;
    Frequency::new::<hertz>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let _v = volts(12.0);
        let _i = amps(1.0);
        let _r = ohms(9.0);
        let _l = henries(1e-3);
        let _c = farads(47e-6);
        let _f = hz(10_000.0);
        let _t = s(1e-4);
    }

    #[test]
    fn derived_quantities_keep_si_values() {
        use uom::si::frequency::kilohertz;
        use uom::si::inductance::millihenry;
        use uom::si::time::microsecond;

        assert!((henries(1.5e-3).get::<millihenry>() - 1.5).abs() < 1e-12);
        assert!((hz(10_000.0).get::<kilohertz>() - 10.0).abs() < 1e-12);
        assert!((s(1e-4).get::<microsecond>() - 100.0).abs() < 1e-9);

        // Ohm's law through the type system.
        let i: Current = volts(9.0) / ohms(9.0);
        assert!((i.value - 1.0).abs() < 1e-12);
    }
}

use super::mock_bus::{as_shared_bus, MockBus};
use crate::battery::{battery_voltage, build_channels, detect_ads7830, read_voltage, BatteryError};
use crate::config::DEFAULT_BATTERY_ADDRS;
use crate::drivers::ads7830::{command_byte, Ads7830, Ads7830Error, AnalogIn};

#[test]
fn command_bytes() {
    assert_eq!(command_byte(0), Ok(0x8C));
    assert_eq!(command_byte(1), Ok(0xCC));
    assert_eq!(command_byte(2), Ok(0x9C));
    assert_eq!(command_byte(7), Ok(0xFC));
    assert_eq!(command_byte(8), Err(Ads7830Error::InvalidChannel(8)));
}

#[test]
fn reads_left_justified() {
    let bus = MockBus::new().with_adc(0x48, [0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80]).shared();
    let adc = Ads7830::new(as_shared_bus(&bus), 0x48).unwrap();

    assert_eq!(adc.read(3), Ok(0x40));
    assert_eq!(adc.value(3), Ok(0x4000));
    assert_eq!(adc.value(6), Ok(0x7000));
    assert!(AnalogIn::new(&adc, 8).is_err());
}

#[test]
fn detect_first_responding() {
    let bus = MockBus::new()
        .with_adc(0x4A, [0; 8])
        .with_adc(0x4B, [0; 8])
        .shared();

    let adc = detect_ads7830(&as_shared_bus(&bus), &DEFAULT_BATTERY_ADDRS).unwrap();
    assert_eq!(adc.address(), 0x4A);
}

#[test]
fn detect_none() {
    let bus = MockBus::new().shared();

    match detect_ads7830(&as_shared_bus(&bus), &[0x48, 0x49]) {
        Err(BatteryError::NotDetected { addresses, source }) => {
            assert_eq!(addresses, vec![0x48, 0x49]);
            assert!(matches!(source, Some(Ads7830Error::Bus(_))));
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("detected a device on an empty bus"),
    }
}

#[test]
fn voltage_scaling() {
    assert_eq!(battery_voltage(0), 0.0);
    assert!((battery_voltage(u16::MAX) - 8.4).abs() < 1e-5);
    assert!((battery_voltage(0x8000) - 4.2).abs() < 0.001);
}

#[test]
fn channel_readers() {
    let bus = MockBus::new().with_adc(0x48, [0xFF, 0, 0, 0, 0, 0, 0, 0x80]).shared();
    let adc = Ads7830::new(as_shared_bus(&bus), 0x48).unwrap();
    let channels = build_channels(&adc).unwrap();

    assert_eq!(channels.len(), 8);
    assert_eq!(channels[7].channel(), 7);
    assert_eq!(channels[0].value(), Ok(0xFF00));

    let volts = read_voltage(&channels[0]).unwrap();
    assert!((volts - 8.367).abs() < 0.001);
}

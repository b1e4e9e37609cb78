use super::mock_bus::{mock_context, MockBus};
use crate::bus::{BusOpener, I2CError};
use crate::hat::{HatError, Pca9685Context};
use std::error::Error;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

const REGISTER_MODE1: u8 = 0x00;
const REGISTER_PRESCALE: u8 = 0xFE;

#[test]
fn only_last_candidate_responds() {
    let bus = MockBus::new().with_registers(0x42).shared();
    let (context, _) = mock_context(&bus, vec![]);

    let controller = context.get_pca9685(50, Some(&[0x40, 0x41, 0x42][..])).unwrap();
    assert_eq!(controller.lock().address(), 0x42);
    assert_eq!(controller.lock().frequency(), Some(50));
    assert_eq!(context.get_active_address(), Some(0x42));
    assert!(context.is_initialized());

    // 25 MHz / 4096 / 50 Hz, rounded
    assert_eq!(bus.lock().register(0x42, REGISTER_PRESCALE), 122);
}

#[test]
fn defaults_probe_vendor_address_first() {
    let bus = MockBus::new().with_registers(0x40).with_registers(0x5F).shared();
    let (context, _) = mock_context(&bus, vec![]);

    context.get_pca9685(50, None).unwrap();
    assert_eq!(context.get_active_address(), Some(0x5F));
    assert_eq!(bus.lock().write_count(0x40), 0);
}

#[test]
fn configured_addresses_used_without_argument() {
    let bus = MockBus::new().with_registers(0x40).with_registers(0x41).shared();
    let (context, _) = mock_context(&bus, vec![0x41, 0x40]);

    context.get_pca9685(50, None).unwrap();
    assert_eq!(context.get_active_address(), Some(0x41));
}

#[test]
fn explicit_addresses_override_configuration() {
    let bus = MockBus::new().with_registers(0x40).with_registers(0x41).shared();
    let (context, _) = mock_context(&bus, vec![0x41]);

    context.get_pca9685(50, Some(&[0x40][..])).unwrap();
    assert_eq!(context.get_active_address(), Some(0x40));
}

#[test]
fn responding_but_unreadable_chip_is_skipped() {
    let bus = MockBus::new().with_write_only(0x5F).with_registers(0x40).shared();
    let (context, _) = mock_context(&bus, vec![]);

    context.get_pca9685(50, None).unwrap();
    assert_eq!(context.get_active_address(), Some(0x40));
    assert!(bus.lock().write_count(0x5F) > 0);
}

#[test]
fn cached_controller_is_reused() {
    let bus = MockBus::new().with_registers(0x5F).shared();
    let (context, opens) = mock_context(&bus, vec![]);

    let first = context.get_pca9685(50, None).unwrap();
    let second = context.get_pca9685(60, None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.lock().frequency(), Some(60));
    assert_eq!(bus.lock().register(0x5F, REGISTER_PRESCALE), 102);

    // zero leaves the frequency alone
    let third = context.get_pca9685(0, None).unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(third.lock().frequency(), Some(60));

    assert_eq!(opens.load(Ordering::SeqCst), 1);
}

#[test]
fn cached_controller_ignores_new_addresses() {
    let bus = MockBus::new().with_registers(0x5F).with_registers(0x40).shared();
    let (context, _) = mock_context(&bus, vec![]);

    let first = context.get_pca9685(50, None).unwrap();
    let second = context.get_pca9685(50, Some(&[0x40][..])).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(context.get_active_address(), Some(0x5F));
}

#[test]
fn deinit_then_reprobe() {
    let bus = MockBus::new().with_registers(0x5F).with_registers(0x40).shared();
    let (context, opens) = mock_context(&bus, vec![]);

    let first = context.get_pca9685(50, None).unwrap();
    assert_eq!(context.get_active_address(), Some(0x5F));

    context.deinit();
    assert_eq!(context.get_active_address(), None);
    assert!(!context.is_initialized());
    assert!(first.lock().is_released());

    // powered down: oscillator asleep
    assert_eq!(bus.lock().register(0x5F, REGISTER_MODE1), 0x10);

    let second = context.get_pca9685(50, Some(&[0x40][..])).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(context.get_active_address(), Some(0x40));

    // the bus survives deinit
    assert_eq!(opens.load(Ordering::SeqCst), 1);
}

#[test]
fn deinit_without_controller() {
    let bus = MockBus::new().shared();
    let (context, opens) = mock_context(&bus, vec![]);

    context.deinit();
    context.deinit();
    assert_eq!(context.get_active_address(), None);
    assert_eq!(opens.load(Ordering::SeqCst), 0);
}

#[test]
fn all_candidates_fail() {
    let bus = MockBus::new().with_write_only(0x41).shared();
    let (context, _) = mock_context(&bus, vec![]);

    let err = context.get_pca9685(50, Some(&[0x40, 0x41][..])).unwrap_err();
    match &err {
        HatError::ChipNotFound { addresses, source } => {
            assert_eq!(addresses, &vec![0x40, 0x41]);
            assert!(source.is_some());
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(err.source().is_some());
    assert!(err.to_string().contains("0x40, 0x41"));
    assert_eq!(context.get_active_address(), None);
    assert!(!context.is_initialized());
}

#[test]
fn bus_open_failure() {
    let opener: BusOpener = Box::new(|| Err(I2CError::BusNotFound(7)));
    let context = Pca9685Context::with_bus_opener(opener, vec![]);

    assert_eq!(
        context.get_pca9685(50, None).unwrap_err(),
        HatError::Bus(I2CError::BusNotFound(7))
    );
    assert_eq!(context.get_active_address(), None);
}

#[test]
fn unsupported_frequency_counts_as_failed_probe() {
    let bus = MockBus::new().with_registers(0x5F).shared();
    let (context, _) = mock_context(&bus, vec![]);

    assert!(matches!(
        context.get_pca9685(5000, None),
        Err(HatError::ChipNotFound { .. })
    ));
    assert!(!context.is_initialized());
}

#[test]
fn concurrent_callers_share_one_probe() {
    let bus = MockBus::new().with_registers(0x40).shared();
    let (context, opens) = mock_context(&bus, vec![0x41, 0x40]);

    let (first, second) = thread::scope(|s| {
        let a = s.spawn(|| context.get_pca9685(50, None).unwrap());
        let b = s.spawn(|| context.get_pca9685(50, None).unwrap());
        (a.join().unwrap(), b.join().unwrap())
    });

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert_eq!(context.get_active_address(), Some(0x40));

    // a single probe: reset, MODE1 read-back, then the frequency sequence
    assert_eq!(bus.lock().write_count(0x40), 7);
}

#[test]
fn transport_is_named() {
    let bus = MockBus::new().shared();
    assert_eq!(super::mock_bus::as_shared_bus(&bus).lock().name(), "mock");
}

//! Discovery over synthetic sysfs trees.

use hiddeck::device::variant::{ELGATO_VENDOR_ID, product_id};
use hiddeck::device::{VariantDescriptor, VariantRegistry, find_devices_under, select_device};
use hiddeck::error::DeckError;

use crate::common::init_test_logging;
use crate::common::sysfs::FakeSysfs;

#[test]
fn finds_device_and_its_hidraw_node() {
    init_test_logging();
    let sysfs = FakeSysfs::new();
    sysfs.add_usb_device("1-4", ELGATO_VENDOR_ID, product_id::XL, Some("CL12345"));
    sysfs.add_hidraw("1-4", product_id::XL, "hidraw3");

    let devices = find_devices_under(&sysfs.roots(), &VariantRegistry::builtin()).unwrap();

    assert_eq!(devices.len(), 1);
    let d = &devices[0];
    assert_eq!(d.node_path, sysfs.path().join("dev/hidraw3"));
    assert_eq!(d.sysfs_path, sysfs.roots().sysfs.join("1-4"));
    assert_eq!(d.serial.as_deref(), Some("CL12345"));
    assert_eq!(d.manufacturer.as_deref(), Some("Elgato"));
    assert_eq!(d.product_id, product_id::XL);
    assert_eq!(d.variant, VariantDescriptor::XL);
}

#[test]
fn unsupported_and_attribute_less_entries_are_skipped() {
    let sysfs = FakeSysfs::new();
    sysfs.add_usb_device("1-1", 0x046d, 0xc52b, None);
    sysfs.add_usb_device("1-2", ELGATO_VENDOR_ID, 0x0fff, None);
    sysfs.add_interface_entry("1-9:1.0");
    sysfs.add_usb_device("1-3", ELGATO_VENDOR_ID, product_id::MINI, None);
    sysfs.add_hidraw("1-3", product_id::MINI, "hidraw0");

    let devices = find_devices_under(&sysfs.roots(), &VariantRegistry::builtin()).unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].variant.name, "Stream Deck Mini");
    assert_eq!(devices[0].serial, None);
}

#[test]
fn empty_bus_yields_no_devices() {
    let sysfs = FakeSysfs::new();
    let devices = find_devices_under(&sysfs.roots(), &VariantRegistry::builtin()).unwrap();
    assert!(devices.is_empty());
    assert!(matches!(select_device(devices, None), Err(DeckError::NoDevicesFound)));
}

#[test]
fn decoy_hidraw_directories_are_ignored() {
    let sysfs = FakeSysfs::new();
    sysfs.add_usb_device("1-4", ELGATO_VENDOR_ID, product_id::ORIGINAL_V2, None);
    sysfs.add_decoy_node("1-4", "hidraw9");
    sysfs.add_linked_node("1-4", "hidraw8");
    sysfs.add_hidraw("1-4", product_id::ORIGINAL_V2, "hidraw2");

    let devices = find_devices_under(&sysfs.roots(), &VariantRegistry::builtin()).unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].node_path, sysfs.path().join("dev/hidraw2"));
}

#[test]
fn matched_device_without_node_aborts_scan() {
    let sysfs = FakeSysfs::new();
    sysfs.add_usb_device("1-4", ELGATO_VENDOR_ID, product_id::XL, Some("A"));
    sysfs.add_hidraw("1-4", product_id::XL, "hidraw1");
    sysfs.add_usb_device("1-5", ELGATO_VENDOR_ID, product_id::NEO, Some("B"));

    let err = find_devices_under(&sysfs.roots(), &VariantRegistry::builtin()).unwrap_err();

    match err {
        DeckError::NoInputNode { sysfs_path } => {
            assert_eq!(sysfs_path, sysfs.roots().sysfs.join("1-5"));
        }
        other => panic!("expected NoInputNode, got {other:?}"),
    }
}

#[test]
fn injected_registry_limits_matches() {
    let sysfs = FakeSysfs::new();
    sysfs.add_usb_device("1-4", ELGATO_VENDOR_ID, product_id::XL, None);
    sysfs.add_hidraw("1-4", product_id::XL, "hidraw1");
    sysfs.add_usb_device("1-5", 0x1234, 0x5678, Some("proto"));
    sysfs.add_hidraw("1-5", 0x5678, "hidraw5");

    let registry = VariantRegistry::new().with(
        0x1234,
        0x5678,
        VariantDescriptor {
            name: "Prototype Panel",
            ..VariantDescriptor::MINI
        },
    );
    let devices = find_devices_under(&sysfs.roots(), &registry).unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].variant.name, "Prototype Panel");
    assert_eq!(devices[0].node_path, sysfs.path().join("dev/hidraw5"));
}

#[test]
fn selection_by_serial_over_discovered_devices() {
    let sysfs = FakeSysfs::new();
    sysfs.add_usb_device("1-4", ELGATO_VENDOR_ID, product_id::XL, Some("AAA"));
    sysfs.add_hidraw("1-4", product_id::XL, "hidraw1");
    sysfs.add_usb_device("1-5", ELGATO_VENDOR_ID, product_id::MINI, Some("BBB"));
    sysfs.add_hidraw("1-5", product_id::MINI, "hidraw2");

    let devices = find_devices_under(&sysfs.roots(), &VariantRegistry::builtin()).unwrap();
    assert_eq!(devices.len(), 2);

    let err = select_device(devices.clone(), None).unwrap_err();
    assert!(matches!(err, DeckError::MultipleDevices { .. }));

    let mini = select_device(devices, Some("BBB")).unwrap();
    assert_eq!(mini.node_path, sysfs.path().join("dev/hidraw2"));
}

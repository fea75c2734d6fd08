//! End-to-end endpoint tests.
//!
//! A temporary file stands in for physical memory: registers are mapped
//! from it through the same `DevMemMapper` that maps `/dev/mem`, so every
//! store is visible to the next load and to the file itself.

use bytereg_common::config::{ByteregConfig, DriverConfig};
use bytereg_common::consts::COMPATIBLE_ID;
use bytereg_common::error::DriverError;
use bytereg_common::platform::{HardwareInstanceDescriptor, PlatformConfig, RegisterRange};
use bytereg_driver::{
    dev_mem_bus, BindingManager, DevMemMapper, MatchTable, PlatformBus, RegisterAccessUnit,
    ResourceTable, Transfer,
};
use proptest::prelude::*;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use tempfile::NamedTempFile;

// ─── Helpers ────────────────────────────────────────────────────────

const MEM_SIZE: u64 = 0x4000;

/// Zero-filled file large enough for every range used below.
fn fake_mem() -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    file.as_file().set_len(MEM_SIZE).expect("set_len");
    file
}

fn bus_over(mem: &NamedTempFile) -> PlatformBus {
    dev_mem_bus(&DriverConfig {
        mem_device: mem.path().to_path_buf(),
        sync: false,
    })
}

fn simple(name: &str, base: u64, length: u64) -> HardwareInstanceDescriptor {
    HardwareInstanceDescriptor::new(name, COMPATIBLE_ID, RegisterRange::new(base, length))
}

// ─── Scenarios ──────────────────────────────────────────────────────

#[test]
fn test_write_then_read_through_endpoint() {
    let mem = fake_mem();
    let mut bus = bus_over(&mem);

    let id = bus
        .add_device(&simple("leds@1000", 0x1000, 4))
        .expect("bind")
        .expect("compatible");
    assert_eq!(id.name.as_str(), "simple");

    let session = bus.endpoints().open_by_name("simple").expect("open");
    assert_eq!(session.write(&[0x7fu8], 1, &mut 0), 1);

    let mut buf = [0u8; 1];
    assert_eq!(session.read(&mut buf, 1, &mut 0), 1);
    assert_eq!(buf, [0x7f]);
    session.close();

    bus.shutdown();
    let bytes = std::fs::read(mem.path()).unwrap();
    assert_eq!(bytes[0x1000], 0x7f);
}

#[test]
fn test_read_reflects_external_register_change() {
    let mem = fake_mem();
    let mut bus = bus_over(&mem);
    bus.add_device(&simple("leds@1000", 0x1000, 4)).unwrap();
    let session = bus.endpoints().open_by_name("simple").unwrap();

    // A second mapping of the same bytes plays the hardware side.
    let hw = RegisterAccessUnit::acquire(
        &ResourceTable::new(),
        &DevMemMapper::new(mem.path(), false),
        "hw",
        RegisterRange::new(0x1000, 1),
    )
    .unwrap();

    for value in [0x01u8, 0x80, 0xff] {
        hw.store(value);
        let mut buf = [0u8; 8];
        assert_eq!(session.read(&mut buf, 8, &mut 0), 1);
        assert_eq!(buf[0], value);
    }
}

#[test]
fn test_colliding_instance_fails_resource_unavailable() {
    let mem = fake_mem();
    let mut bus = bus_over(&mem);
    bus.add_device(&simple("a", 0x1000, 4)).unwrap();

    let err = bus.add_device(&simple("b", 0x1000, 4)).unwrap_err();
    assert!(matches!(err, DriverError::ResourceUnavailable { .. }));
    assert!(!bus.manager().is_bound("b"));
    assert_eq!(bus.endpoints().len(), 1);
}

#[test]
fn test_missing_memory_device_fails_bind() {
    let mut bus = dev_mem_bus(&DriverConfig {
        mem_device: "/nonexistent/mem".into(),
        sync: true,
    });
    let err = bus.add_device(&simple("a", 0x1000, 4)).unwrap_err();
    assert!(matches!(err, DriverError::ResourceUnavailable { .. }));
    assert!(bus.endpoints().is_empty());
    assert!(bus.manager().resources().claims().is_empty());
}

#[test]
fn test_range_past_end_of_memory_fails_bind() {
    let mem = fake_mem();
    let mut bus = bus_over(&mem);

    let err = bus.add_device(&simple("far", 2 * MEM_SIZE, 4)).unwrap_err();
    assert!(matches!(err, DriverError::ResourceUnavailable { .. }));
    assert!(bus.endpoints().is_empty());
    assert!(bus.manager().resources().claims().is_empty());
}

#[test]
fn test_zero_length_calls_do_not_touch_register() {
    let mem = fake_mem();
    let mut bus = bus_over(&mem);
    bus.add_device(&simple("a", 0x1000, 1)).unwrap();
    let session = bus.endpoints().open_by_name("simple").unwrap();

    let mut buf = [0xaau8; 1];
    assert_eq!(session.read_transfer(&mut buf, 0), Transfer::Idle);
    assert_eq!(buf, [0xaa]);
    assert_eq!(session.write(&[0x55u8], 0, &mut 0), 0);

    let mut check = [0u8; 1];
    assert_eq!(session.read(&mut check, 1, &mut 0), 1);
    assert_eq!(check, [0x00]);
}

#[test]
fn test_sessions_outlive_unbind_safely() {
    let mem = fake_mem();
    let mut bus = bus_over(&mem);
    bus.add_device(&simple("a", 0x1000, 1)).unwrap();
    let session = bus.endpoints().open_by_name("simple").unwrap();
    assert_eq!(session.write(&[0x11u8], 1, &mut 0), 1);

    assert!(bus.remove_device("a").unwrap());
    assert!(bus.endpoints().open_by_name("simple").is_err());
    assert!(!session.device().is_attached());

    let mut buf = [0u8; 1];
    assert_eq!(session.read_transfer(&mut buf, 1), Transfer::Detached);
    assert_eq!(session.write_transfer(&[0x22u8], 1), Transfer::Detached);
    assert_eq!(std::fs::read(mem.path()).unwrap()[0x1000], 0x11);

    // Range is free again for a fresh discovery event.
    assert!(bus.add_device(&simple("a", 0x1000, 1)).unwrap().is_some());
}

#[test]
fn test_concurrent_sessions_during_unbind() {
    let mem = fake_mem();
    let mapper = Arc::new(DevMemMapper::new(mem.path(), false));
    let mut manager = BindingManager::new(MatchTable::simple(), mapper);
    manager.probe(&simple("a", 0x2000, 1)).unwrap();
    let registry = Arc::clone(manager.endpoints());

    const ITERATIONS: usize = 10_000;
    let workers: Vec<_> = (0..4u8)
        .map(|i| {
            let session = registry.open_by_name("simple").unwrap();
            thread::spawn(move || {
                let mut moved = 0usize;
                for _ in 0..ITERATIONS {
                    let mut buf = [0u8; 1];
                    let wrote = session.write(&[i], 1, &mut 0);
                    let read = session.read(&mut buf, 1, &mut 0);
                    assert!(wrote <= 1 && read <= 1);
                    if read == 1 {
                        assert!(buf[0] < 4, "foreign value {:#x}", buf[0]);
                    }
                    moved += wrote + read;
                    if !session.device().is_attached() {
                        break;
                    }
                }
                (moved, session)
            })
        })
        .collect();

    manager.remove("a").unwrap();
    for worker in workers {
        let (moved, session) = worker.join().expect("worker panicked");
        assert!(moved <= 2 * ITERATIONS);

        // Every session is now fenced off from the released range.
        let mut buf = [0u8; 1];
        assert_eq!(session.read_transfer(&mut buf, 1), Transfer::Detached);
        assert_eq!(session.write_transfer(&[0xeeu8], 1), Transfer::Detached);
    }

    assert!(registry.is_empty());
    assert!(manager.resources().claims().is_empty());
    assert!(std::fs::read(mem.path()).unwrap()[0x2000] < 4);
}

#[test]
fn test_bus_from_config_file() {
    let mem = fake_mem();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[shared]
service_name = "bytereg-it"

[driver]
mem_device = "{}"
sync = false

[[devices]]
name = "leds@1000"
compatible = "xlnx,interrupt-demo-1.0"
reg = [0x1000, 4]

[[devices]]
name = "uart@2000"
compatible = "ns16550a"
reg = [0x2000, 8]

[[devices]]
name = "switches@3000"
compatible = "xlnx,interrupt-demo-1.0"
reg = [0x3000, 4]
"#,
        mem.path().display()
    )
    .unwrap();
    file.flush().unwrap();

    let config = ByteregConfig::load_validated(file.path()).expect("config");
    let mut bus = dev_mem_bus(&config.driver);
    let report = bus.populate(&config.platform);

    assert!(report.is_clean());
    assert_eq!(report.skipped, vec!["uart@2000".to_string()]);
    let names: Vec<String> = bus
        .endpoints()
        .list()
        .iter()
        .map(|id| id.name.to_string())
        .collect();
    assert_eq!(names, vec!["simple", "simple1"]);

    let leds = bus.endpoints().open_by_name("simple").unwrap();
    let switches = bus.endpoints().open_by_name("simple1").unwrap();
    assert_eq!(leds.write(&[0xa0u8], 1, &mut 0), 1);
    assert_eq!(switches.write(&[0x0bu8], 1, &mut 0), 1);

    bus.shutdown();
    let bytes = std::fs::read(mem.path()).unwrap();
    assert_eq!(bytes[0x1000], 0xa0);
    assert_eq!(bytes[0x3000], 0x0b);
}

#[test]
fn test_populate_with_empty_platform() {
    let mem = fake_mem();
    let mut bus = bus_over(&mem);
    let report = bus.populate(&PlatformConfig::default());
    assert!(report.bound.is_empty());
    assert!(report.is_clean());
}

// ─── Properties ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_store_then_load_round_trips(value in any::<u8>(), offset in 0u64..0x1000) {
        let mem = fake_mem();
        let unit = RegisterAccessUnit::acquire(
            &ResourceTable::new(),
            &DevMemMapper::new(mem.path(), false),
            "prop",
            RegisterRange::new(0x1000 + offset, 1),
        )
        .unwrap();

        unit.store(value);
        prop_assert_eq!(unit.load(), value);
    }
}

#[test]
fn test_shipped_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/platform.toml");
    let config = ByteregConfig::load_validated(&path).expect("shipped config");
    assert_eq!(config.platform.devices.len(), 3);
    assert!(config.driver.sync);
}

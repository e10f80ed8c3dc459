//! Resolver behavior tests with scripted sources.

use std::cell::Cell;
use std::rc::Rc;

use super::reading::{Reading, SourceKind};
use super::resolver::{LocationSource, Resolver};

/// Source that returns a fixed answer and counts how often it is consulted.
struct ScriptedSource {
    kind: SourceKind,
    reading: Option<Reading>,
    calls: Rc<Cell<usize>>,
}

impl ScriptedSource {
    fn new(kind: SourceKind, reading: Option<Reading>) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Self {
                kind,
                reading,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl LocationSource for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn acquire(&mut self) -> Option<Reading> {
        self.calls.set(self.calls.get() + 1);
        self.reading.clone()
    }
}

fn reading(lat: f64, lon: f64) -> Reading {
    Reading::checked(lat, lon).unwrap()
}

#[test]
fn first_successful_source_wins() {
    let (gps, gps_calls) = ScriptedSource::new(SourceKind::Gps, Some(reading(52.0, 4.9)));
    let (wifi, wifi_calls) = ScriptedSource::new(SourceKind::WiFi, Some(reading(1.0, 1.0)));
    let (ip, ip_calls) = ScriptedSource::new(SourceKind::Ip, Some(reading(2.0, 2.0)));

    let mut resolver = Resolver::new(vec![Box::new(gps), Box::new(wifi), Box::new(ip)]);
    let resolved = resolver.resolve().expect("resolution expected");

    assert_eq!(resolved.source, SourceKind::Gps);
    assert_eq!(resolved.reading.latitude, 52.0);
    // Lower-priority sources must not be consulted after a success
    assert_eq!(gps_calls.get(), 1);
    assert_eq!(wifi_calls.get(), 0);
    assert_eq!(ip_calls.get(), 0);
}

#[test]
fn fallback_reaches_lower_priority_sources() {
    let (gps, _) = ScriptedSource::new(SourceKind::Gps, None);
    let (platform, _) = ScriptedSource::new(SourceKind::PlatformLocation, None);
    let (wifi, _) = ScriptedSource::new(SourceKind::WiFi, None);
    let (ip, _) = ScriptedSource::new(SourceKind::Ip, Some(reading(51.5, -0.1)));

    let mut resolver = Resolver::new(vec![
        Box::new(gps),
        Box::new(platform),
        Box::new(wifi),
        Box::new(ip),
    ]);
    let resolved = resolver.resolve().expect("resolution expected");
    assert_eq!(resolved.source, SourceKind::Ip);
    assert_eq!(resolved.reading.latitude, 51.5);
    assert_eq!(resolved.reading.longitude, -0.1);
}

#[test]
fn exhausted_sources_yield_not_found() {
    let (gps, gps_calls) = ScriptedSource::new(SourceKind::Gps, None);
    let (ip, ip_calls) = ScriptedSource::new(SourceKind::Ip, None);

    let mut resolver = Resolver::new(vec![Box::new(gps), Box::new(ip)]);
    assert!(resolver.resolve().is_none());
    assert!(resolver.last_known().is_none());
    assert_eq!(gps_calls.get(), 1);
    assert_eq!(ip_calls.get(), 1);
}

#[test]
fn empty_source_list_yields_not_found() {
    let mut resolver = Resolver::new(Vec::new());
    assert!(resolver.resolve().is_none());
}

#[test]
fn last_known_is_wholly_replaced_on_each_success() {
    let (first, _) = ScriptedSource::new(SourceKind::WiFi, Some(reading(40.0, -74.0)));
    let mut resolver = Resolver::new(vec![Box::new(first)]);
    resolver.resolve().unwrap();
    let first_stamp = resolver.last_known().unwrap().timestamp;
    assert_eq!(resolver.last_known().unwrap().source, SourceKind::WiFi);

    resolver.resolve().unwrap();
    let last = resolver.last_known().unwrap();
    assert_eq!(last.reading.latitude, 40.0);
    assert!(last.timestamp >= first_stamp);
}

#[test]
fn failed_cycle_keeps_previous_resolution() {
    struct OnceSource {
        served: bool,
    }
    impl LocationSource for OnceSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Gps
        }
        fn acquire(&mut self) -> Option<Reading> {
            if self.served {
                None
            } else {
                self.served = true;
                Reading::checked(52.0, 4.9)
            }
        }
    }

    let mut resolver = Resolver::new(vec![Box::new(OnceSource { served: false })]);
    assert!(resolver.resolve().is_some());
    assert!(resolver.resolve().is_none());
    // The stored resolution survives an empty cycle
    assert_eq!(resolver.last_known().unwrap().reading.latitude, 52.0);
}

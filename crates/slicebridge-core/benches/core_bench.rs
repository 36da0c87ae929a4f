use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slicebridge_core::{
    ConfigChangeBus, ConfigChangeListener, OptionValue, SlicingCompletedInfo,
    SlicingEventDispatcher, SlicingEventSink, SlicingStatus,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

#[derive(Default)]
struct CountingSink(AtomicU64);

impl SlicingEventSink for CountingSink {
    fn on_slicing_update(&self, status: &SlicingStatus) {
        self.0.fetch_add(status.percent as u64, Ordering::Relaxed);
    }
    fn on_slicing_completed(&self, _timestamp: i32) {}
    fn on_process_finished(&self, _info: &SlicingCompletedInfo) {}
    fn on_export_began(&self) {}
    fn on_export_finished(&self, _path: &str) {}
}

impl ConfigChangeListener for CountingSink {
    fn on_config_change(&self, _opt_key: &str, _value: &OptionValue) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

fn dispatcher_fanout(c: &mut Criterion) {
    let dispatcher = SlicingEventDispatcher::new();
    for _ in 0..8 {
        dispatcher.add_sink(Arc::new(CountingSink::default()));
    }
    let status = SlicingStatus::new(50, "Generating skirt & brim");

    c.bench_function("dispatcher_update_8_sinks", |b| {
        b.iter(|| dispatcher.on_slicing_update(black_box(&status)))
    });
}

fn config_bus_notify(c: &mut Criterion) {
    let bus = ConfigChangeBus::new();
    let listeners: Vec<Arc<CountingSink>> = (0..8).map(|_| Arc::new(CountingSink::default())).collect();
    for listener in &listeners {
        let weak: Weak<CountingSink> = Arc::downgrade(listener);
        bus.add_listener(weak);
    }
    let value = OptionValue::Float(0.2);

    c.bench_function("config_bus_notify_8_listeners", |b| {
        b.iter(|| bus.notify(black_box("layer_height"), black_box(&value)))
    });
}

criterion_group!(benches, dispatcher_fanout, config_bus_notify);
criterion_main!(benches);

use serde_json::Value;
use slicebridge_core::{ConfigChangeBus, ConfigOption, OptionValue, PrintConfig};
use slicebridge_mqtt::{MemoryTransport, MqttConfigPublisher};
use std::sync::Arc;

fn connected_publisher() -> (Arc<MqttConfigPublisher>, Arc<MemoryTransport>) {
    let publisher = MqttConfigPublisher::create_default().unwrap();
    let transport = Arc::new(MemoryTransport::new());
    publisher.attach_transport(transport.clone());
    (publisher, transport)
}

fn payload(transport: &MemoryTransport, topic: &str) -> Value {
    let retained = transport
        .retained(topic)
        .unwrap_or_else(|| panic!("nothing retained on {}", topic));
    serde_json::from_str(&retained).unwrap()
}

#[test]
fn test_config_change_on_routed_topic() {
    let (publisher, transport) = connected_publisher();

    assert!(publisher.publish_change("layer_height", &OptionValue::Float(0.2)));

    let messages = transport.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].topic,
        "slicer/config/quality/layer_height/layer_height"
    );
    assert!(messages[0].retained);

    let body = messages[0].json().unwrap();
    assert_eq!(body["key"], "layer_height");
    assert_eq!(body["value"], 0.2);
    assert_eq!(body["type"], "float");
    assert_eq!(body["meta"]["label"], "Layer height");
    assert_eq!(body["meta"]["unit"], "mm");
    assert!(body["meta"].get("max").is_none());
}

#[test]
fn test_unknown_key_fallback() {
    let (publisher, transport) = connected_publisher();

    publisher.publish_change("no_such_key", &OptionValue::Bool(true));

    let body = payload(&transport, "slicer/config/unknown/no_such_key");
    assert_eq!(body["value"], true);
    assert_eq!(body["type"], "bool");
    assert!(body.get("meta").is_none());
}

#[test]
fn test_republish_keeps_one_retained_message() {
    let (publisher, transport) = connected_publisher();
    let value = OptionValue::Int(3);

    publisher.publish_change("wall_loops", &value);
    let first = transport.retained("slicer/config/strength/walls/wall_loops");
    publisher.publish_change("wall_loops", &value);

    assert_eq!(transport.len(), 2);
    assert_eq!(transport.retained_count(), 1);
    assert_eq!(
        transport.retained("slicer/config/strength/walls/wall_loops"),
        first
    );
}

#[test]
fn test_bus_notifications_reach_publisher() {
    let (publisher, transport) = connected_publisher();
    let bus = ConfigChangeBus::new();
    publisher.register_with(&bus);

    bus.notify("sparse_infill_density", &OptionValue::Float(15.0));

    assert_eq!(
        transport.topics(),
        vec!["slicer/config/strength/sparse_infill/sparse_infill_density"]
    );
}

#[test]
fn test_dropped_publisher_is_swept_from_bus() {
    let (publisher, _transport) = connected_publisher();
    let bus = ConfigChangeBus::new();
    publisher.register_with(&bus);
    assert_eq!(bus.listener_count(), 1);

    drop(publisher);
    bus.notify("layer_height", &OptionValue::Float(0.2));
    assert_eq!(bus.listener_count(), 0);
}

#[test]
fn test_per_extruder_expansion() {
    let (publisher, transport) = connected_publisher();
    let config = PrintConfig::new()
        .with("nozzle_diameter", ConfigOption::Floats(vec![0.4, 0.6]))
        .with("retraction_length", ConfigOption::Floats(vec![1.0, 1.5]))
        .with("printable_height", ConfigOption::Float(250.0))
        .with("printer_model", ConfigOption::String("X1".into()));

    publisher.publish_printer_config(&config, "P1");

    let name = payload(&transport, "slicer/config/printer/preset_name");
    assert_eq!(name["value"], "P1");
    assert_eq!(name["type"], "string");

    let r0 = payload(
        &transport,
        "slicer/config/printer/extruder/0/retraction/retraction_length",
    );
    let r1 = payload(
        &transport,
        "slicer/config/printer/extruder/1/retraction/retraction_length",
    );
    assert_eq!(r0["value"], 1.0);
    assert_eq!(r1["value"], 1.5);
    assert_eq!(r1["type"], "float");

    assert_eq!(
        payload(
            &transport,
            "slicer/config/printer/extruder/1/basic_information/nozzle_diameter"
        )["value"],
        0.6
    );
    assert!(transport
        .retained("slicer/config/printer/basic_information/printable_space/printable_height")
        .is_some());
    assert!(transport
        .retained("slicer/config/printer/misc/printer_model")
        .is_some());
}

#[test]
fn test_extruder_count_defaults_to_one() {
    let (publisher, transport) = connected_publisher();
    let config =
        PrintConfig::new().with("retraction_length", ConfigOption::Floats(vec![0.8, 2.0]));

    publisher.publish_printer_config(&config, "P2");

    let extruder_topics: Vec<String> = transport
        .topics()
        .into_iter()
        .filter(|t| t.contains("/extruder/"))
        .collect();
    assert_eq!(
        extruder_topics,
        vec!["slicer/config/printer/extruder/0/retraction/retraction_length"]
    );
}

#[test]
fn test_empty_nozzle_list_means_no_extruders() {
    let (publisher, transport) = connected_publisher();
    let config = PrintConfig::new()
        .with("nozzle_diameter", ConfigOption::Floats(vec![]))
        .with("retraction_length", ConfigOption::Floats(vec![1.0, 1.5]))
        .with("printable_height", ConfigOption::Float(250.0));

    let published = publisher.publish_printer_config(&config, "Empty");

    assert!(transport.topics().iter().all(|t| !t.contains("/extruder/")));
    // preset name and printable_height only
    assert_eq!(published, 2);
}

#[test]
fn test_points_render_per_extruder() {
    let (publisher, transport) = connected_publisher();
    let config = PrintConfig::new()
        .with("nozzle_diameter", ConfigOption::Floats(vec![0.4, 0.4]))
        .with(
            "extruder_offset",
            ConfigOption::Points(vec![(0.0, 0.0), (18.5, -2.0)]),
        );

    publisher.publish_printer_config(&config, "Dual");

    let offset = payload(
        &transport,
        "slicer/config/printer/extruder/1/basic_information/extruder_offset",
    );
    assert_eq!(offset["value"], "18.5,-2");
    assert_eq!(offset["type"], "string");
}

#[test]
fn test_filament_snapshot() {
    let (publisher, transport) = connected_publisher();
    let config = PrintConfig::new()
        .with("filament_type", ConfigOption::Strings(vec!["PLA".into()]))
        .with("nozzle_temperature", ConfigOption::Ints(vec![220]))
        .with("filament_colour", ConfigOption::Strings(vec!["#FF0000".into()]))
        .with("filament_flow_ratio", ConfigOption::Floats(vec![0.98]))
        .with("filament_ramming_points", ConfigOption::Points(vec![(1.0, 2.0)]));

    let published = publisher.publish_filament_config(&config, "Generic PLA", 1);
    assert_eq!(published, 5);

    let name = payload(&transport, "slicer/config/filament/1/preset_name");
    assert_eq!(name["value"], "Generic PLA");
    assert_eq!(name["extruder"], 1);

    let temp = payload(&transport, "slicer/config/filament/1/nozzle_temperature");
    assert_eq!(temp["type"], "ints");
    assert_eq!(temp["value"][0], 220);
    assert!(transport
        .retained("slicer/config/filament/1/filament_ramming_points")
        .is_none());
}

#[test]
fn test_preset_change_events() {
    let (publisher, transport) = connected_publisher();

    assert!(publisher.publish_printer_changed("Old", "New"));
    assert!(publisher.publish_filament_changed(1, "PLA", "PETG"));

    let printer = payload(&transport, "slicer/config/presets/printer");
    assert_eq!(printer["event"], "printer_changed");
    assert_eq!(printer["previous"], "Old");
    assert_eq!(printer["current"], "New");

    let filament = payload(&transport, "slicer/config/presets/filament");
    assert_eq!(filament["event"], "filament_changed");
    assert_eq!(filament["extruder"], 1);
    assert_eq!(filament["current"], "PETG");
}

#[test]
fn test_full_config_in_routing_order() {
    let (publisher, transport) = connected_publisher();
    let config = PrintConfig::new()
        .with("travel_speed", ConfigOption::Float(300.0))
        .with("layer_height", ConfigOption::Float(0.16))
        .with("seam_position", ConfigOption::Enum(1))
        .with(
            "line_width",
            ConfigOption::FloatOrPercent {
                value: 105.0,
                percent: true,
            },
        );

    assert_eq!(publisher.publish_full_config(&config), 4);
    let topics = transport.topics();
    assert_eq!(topics[0], "slicer/config/quality/layer_height/layer_height");

    let line_width = payload(&transport, "slicer/config/quality/line_width/line_width");
    assert_eq!(line_width["value"], "105%");
    assert_eq!(line_width["type"], "string");

    let seam = payload(&transport, "slicer/config/quality/seam/seam_position");
    assert_eq!(seam["value"], 1);
    assert_eq!(seam["meta"]["options"][1]["key"], "back");
}

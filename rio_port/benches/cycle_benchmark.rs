//! Port cycle benchmarks.
//!
//! Measures one `read()` and one `write()` over a fully populated simulated
//! bus for each transaction protocol. The simulated bus adds no latency, so
//! the numbers are the port layer's own overhead.

use criterion::{Criterion, criterion_group, criterion_main};
use rio_common::consts::{MAX_AXES_PER_BOARD, MAX_BOARDS};
use rio_common::port::config::{PortConfig, RobotConfig};
use rio_common::port::types::{AxisBinding, Protocol};
use rio_port::Port;
use rio_port::drivers::simulation::{self, SimulatedBus};
use std::hint::black_box;

/// One robot per board, every axis bound.
fn full_config(protocol: Protocol) -> PortConfig {
    let robots = (0..MAX_BOARDS as u8)
        .map(|board| RobotConfig {
            name: format!("robot_{board}"),
            actuators: (0..MAX_AXES_PER_BOARD as u8)
                .map(|axis| AxisBinding::new(board, axis))
                .collect(),
            brakes: Vec::new(),
        })
        .collect();
    PortConfig {
        protocol,
        robots,
        ..PortConfig::default()
    }
}

fn port(protocol: Protocol) -> Port<SimulatedBus> {
    let config = full_config(protocol);
    let mut port = Port::new(0, simulation::build(&config))
        .with_event_sink(|_: &rio_port::PortEvent| {});
    port.configure(&config).expect("configure port");
    for index in 0..port.number_of_robots() {
        let robot = port.robot_at_mut(index).expect("robot");
        robot.enable_power();
        robot.set_amps_enabled(true);
        robot
            .set_current_commands(&[100; MAX_AXES_PER_BOARD])
            .expect("currents");
    }
    port
}

fn bench_protocol(c: &mut Criterion, name: &str, protocol: Protocol) {
    let mut port = port(protocol);
    c.bench_function(&format!("read_{name}"), |b| {
        b.iter(|| black_box(port.read()));
    });
    c.bench_function(&format!("write_{name}"), |b| {
        b.iter(|| black_box(port.write()));
    });
}

fn bench_sequential(c: &mut Criterion) {
    bench_protocol(c, "sequential", Protocol::Sequential);
}

fn bench_broadcast(c: &mut Criterion) {
    bench_protocol(c, "broadcast", Protocol::BroadcastReadWrite);
}

criterion_group!(benches, bench_sequential, bench_broadcast);
criterion_main!(benches);

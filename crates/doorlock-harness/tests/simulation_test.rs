//! Both real node runtimes over a simulated TCP link.
//!
//! Control runs as a turmoil host, the HMI as a client driven by a scripted
//! keypad. Time is virtual, so a minute of lockout costs nothing.

use std::time::Duration;

use doorlock_core::{MemoryStore, Screen};
use doorlock_harness::{RecordingDisplay, ScriptedActuator, ScriptedKeypad, SimEnv, sim_link};
use doorlock_node::{ControlRuntime, HmiRuntime, IntervalTicker, NodeConfig, NodeError};

const CONTROL_ADDR: &str = "control:7400";

fn sim_config() -> NodeConfig {
    NodeConfig { tick_period: Duration::from_millis(100), ..NodeConfig::default() }
}

/// Run Control as a host and the HMI as a client until the keypad script
/// ends. Returns the screens shown and the Control store.
fn run_pair(builder: &turmoil::Builder, keys: &'static [u8]) -> (Vec<Screen>, MemoryStore) {
    let mut sim = builder.build();
    let store = MemoryStore::new();
    let display = RecordingDisplay::new();

    let control_store = store.clone();
    sim.host("control", move || {
        let store = control_store.clone();
        async move {
            let env = SimEnv::new();
            let config = sim_config();
            let link = sim_link::accept("0.0.0.0:7400").await?;
            let ticks = IntervalTicker::new(env.clone(), config.tick_period);
            let runtime =
                ControlRuntime::start(config, store, link, ScriptedActuator::new(5), ticks, env)
                    .await?;
            runtime.run().await?;
            Ok(())
        }
    });

    let hmi_display = display.clone();
    sim.client("hmi", async move {
        let env = SimEnv::new();
        let config = sim_config();
        let link = sim_link::connect(&env, CONTROL_ADDR, Duration::from_millis(50)).await?;
        let ticks = IntervalTicker::new(env.clone(), config.tick_period);
        let mut runtime =
            HmiRuntime::start(config, link, ScriptedKeypad::new(keys), hmi_display, ticks, env)
                .await?;

        loop {
            match runtime.step().await {
                Ok(()) => {},
                Err(NodeError::OperatorClosed) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    });

    sim.run().unwrap();
    (display.screens(), store)
}

#[test]
fn enroll_and_open_over_simulated_link() {
    let mut builder = turmoil::Builder::new();
    builder.simulation_duration(Duration::from_secs(120));

    let (screens, store) = run_pair(&builder, b"1234=1234=+1234=");

    assert_eq!(
        screens,
        vec![
            Screen::EnterNewCredential,
            Screen::ConfirmCredential,
            Screen::Menu,
            Screen::EnterCurrentCredential,
            Screen::DoorUnlocking,
            Screen::WaitForPassage,
            Screen::DoorLocking,
            Screen::Menu,
        ]
    );
    assert_eq!(&store.snapshot()[0x0200..0x0205], b"\x041234");
}

#[test]
fn lockout_over_a_slow_link() {
    let mut builder = turmoil::Builder::new();
    builder
        .simulation_duration(Duration::from_secs(120))
        .min_message_latency(Duration::from_millis(40))
        .max_message_latency(Duration::from_millis(40));

    let (screens, _) = run_pair(&builder, b"1234=1234=+9=9=9=");

    assert_eq!(
        screens[3..],
        [
            Screen::EnterCurrentCredential,
            Screen::EnterCurrentCredential,
            Screen::EnterCurrentCredential,
            Screen::SystemLocked,
            Screen::Menu,
        ]
    );
}


//! Behavioural tests for the wire protocol served by a running engine.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use cadlink_config::EngineKind;

use super::support::{self, TestWorld};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a running {kind} engine")]
fn given_running_engine(world: &RefCell<TestWorld>, kind: String) -> StepResult {
    let kind: EngineKind = kind
        .parse()
        .map_err(|_| format!("unknown engine kind '{kind}'"))?;
    let mut world = world.borrow_mut();
    world.use_engine(kind);
    world.bootstrap();
    match world.bootstrap_error() {
        Some(error) => Err(format!("engine failed to start: {error}")),
        None => Ok(()),
    }
}

#[when("the client pings with id \"{id}\"")]
fn when_client_pings(world: &RefCell<TestWorld>, id: String) {
    let response = world.borrow_mut().client().call(&id, "ping", json!({}));
    world.borrow_mut().record(response);
}

#[when("the client creates a 10mm box named \"{name}\" with id \"{id}\"")]
fn when_client_creates_box(world: &RefCell<TestWorld>, name: String, id: String) {
    let params = json!({"length": 10, "width": 10, "height": 10, "name": name});
    let response = world.borrow_mut().client().call(&id, "create_box", params);
    world.borrow_mut().record(response);
}

#[when("the client lists objects with id \"{id}\"")]
fn when_client_lists_objects(world: &RefCell<TestWorld>, id: String) {
    let response = world
        .borrow_mut()
        .client()
        .call(&id, "list_objects", json!({}));
    world.borrow_mut().record(response);
}

#[when("the client calls the unknown method \"{method}\" with id \"{id}\"")]
fn when_client_calls_unknown(world: &RefCell<TestWorld>, method: String, id: String) {
    let response = world.borrow_mut().client().call(&id, &method, json!({}));
    world.borrow_mut().record(response);
}

#[when("the client sends a line that is not JSON")]
fn when_client_sends_garbage(world: &RefCell<TestWorld>) {
    let mut borrowed = world.borrow_mut();
    let client = borrowed.client();
    client.send_line("this is not json");
    let response = client.read_response();
    borrowed.record(response);
}

#[when("the client pipelines {count} pings before reading")]
fn when_client_pipelines(world: &RefCell<TestWorld>, count: usize) {
    let mut borrowed = world.borrow_mut();
    let client = borrowed.client();
    for index in 0..count {
        client.send(&format!("pipe-{index}"), "ping", json!({}));
    }
    let responses: Vec<Value> = (0..count).map(|_| client.read_response()).collect();
    for response in responses {
        borrowed.record(response);
    }
}

#[then("the response to \"{id}\" succeeds")]
fn then_response_succeeds(world: &RefCell<TestWorld>, id: String) {
    let world = world.borrow();
    let response = world.response(&id).expect("response missing");
    assert_eq!(response["status"], "success", "{response}");
    assert!(response["error"].is_null());
    assert!(response["result"].is_object());
}

#[then("the response to \"{id}\" fails with \"{code}\"")]
fn then_response_fails(world: &RefCell<TestWorld>, id: String, code: String) {
    let world = world.borrow();
    let response = world.response(&id).expect("response missing");
    assert_eq!(response["status"], "error", "{response}");
    assert!(response["result"].is_null());
    assert_eq!(response["error"]["code"], code.as_str());
}

#[then("the response to \"{id}\" lists an object named \"{name}\"")]
fn then_response_lists(world: &RefCell<TestWorld>, id: String, name: String) {
    let world = world.borrow();
    let response = world.response(&id).expect("response missing");
    let objects = response["result"]["objects"]
        .as_array()
        .expect("objects array");
    assert!(
        objects.iter().any(|object| object["name"] == name.as_str()),
        "{name} missing from {response}"
    );
}

#[then("an uncorrelated response reported \"{code}\"")]
fn then_uncorrelated_error(world: &RefCell<TestWorld>, code: String) {
    let world = world.borrow();
    let found = world.responses().iter().any(|response| {
        response["id"].is_null() && response["error"]["code"] == code.as_str()
    });
    assert!(found, "no uncorrelated {code} in {:?}", world.responses());
}

#[then("the pipelined responses arrive in order with their ids")]
fn then_pipelined_in_order(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let ids: Vec<&str> = world
        .responses()
        .iter()
        .filter_map(|response| response["id"].as_str())
        .collect();
    let expected: Vec<String> = (0..ids.len()).map(|index| format!("pipe-{index}")).collect();
    assert!(!ids.is_empty());
    assert_eq!(ids, expected);
}

#[scenario(path = "tests/features/engine_protocol.feature")]
fn engine_protocol(#[from(world)] world: RefCell<TestWorld>) {
    drop(world);
}

//! Behaviour-driven tests for the invoke interaction.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::{
    Behaviour, FABRIC, FakeClusters, Harness, ON_OFF, PolicyAccess, Setup, StaticGroups, TOGGLE,
    commands_for, empty_fields, encode_request, toggle,
};
use crate::access::{AccessDenial, SubjectDescriptor};
use crate::cluster::CommandMetadata;
use crate::message::{InvokeResponseEntry, RequestCommand};
use crate::path::{CommandPath, ConcreteCommandPath, EndpointId, GroupId};
use crate::status::{Status, StatusIb};
use crate::{EngineLimits, EngineState, ExchangeContext};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestWorld {
    clusters: FakeClusters,
    access: PolicyAccess,
    groups: StaticGroups,
    group: Option<GroupId>,
    limits: EngineLimits,
    harness: Option<Harness>,
    outcome: Option<Status>,
    requested: usize,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn status_named(name: &str) -> Status {
    (0..=u8::MAX)
        .filter_map(Status::from_repr)
        .find(|status| status.to_string() == name)
        .unwrap_or_else(|| panic!("unknown status name '{name}'"))
}

fn add_command(
    world: &mut TestWorld,
    path: ConcreteCommandPath,
    metadata: CommandMetadata,
    behaviour: Behaviour,
) {
    world.clusters = std::mem::take(&mut world.clusters).with_command(path, metadata, behaviour);
}

fn run(world: &mut TestWorld, exchange: ExchangeContext, payload: &[u8], timed: bool) {
    let mut harness = Setup {
        exchange,
        limits: world.limits,
        clusters: std::mem::take(&mut world.clusters),
        access: Box::new(std::mem::take(&mut world.access)),
        groups: std::mem::take(&mut world.groups),
        ..Setup::default()
    }
    .start();
    world.outcome = Some(harness.engine.on_invoke_request(payload, timed));
    world.harness = Some(harness);
}

fn invoke_unicast(world: &mut TestWorld, paths: &[ConcreteCommandPath], suppress: bool) {
    world.requested = paths.len();
    let payload = encode_request(false, suppress, commands_for(paths));
    run(
        world,
        ExchangeContext::unicast(SubjectDescriptor::case(FABRIC, 0x1122)),
        &payload,
        false,
    );
}

fn harness(world: &TestWorld) -> &Harness {
    world.harness.as_ref().expect("no request was invoked")
}

fn entry_where(
    world: &TestWorld,
    predicate: impl Fn(&InvokeResponseEntry) -> bool,
) -> InvokeResponseEntry {
    let entries = harness(world).entries();
    entries
        .iter()
        .find(|entry| predicate(entry))
        .cloned()
        .unwrap_or_else(|| panic!("no matching entry in {entries:?}"))
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("an on-off command on endpoint {endpoint} that reports a level")]
fn given_reporting_command(world: &mut TestWorld, endpoint: EndpointId) {
    add_command(
        world,
        toggle(endpoint),
        CommandMetadata::operate(),
        Behaviour::Report {
            level: 5,
            padding: 0,
        },
    );
}

#[given("an on-off command on endpoint {endpoint} that succeeds")]
fn given_succeeding_command(world: &mut TestWorld, endpoint: EndpointId) {
    add_command(
        world,
        toggle(endpoint),
        CommandMetadata::operate(),
        Behaviour::Status(Status::Success),
    );
}

#[given("an on-off command on endpoint {endpoint} that defers")]
fn given_deferring_command(world: &mut TestWorld, endpoint: EndpointId) {
    add_command(
        world,
        toggle(endpoint),
        CommandMetadata::operate(),
        Behaviour::Defer,
    );
}

#[given("on-off commands on endpoints {first} to {last} that succeed")]
fn given_succeeding_range(world: &mut TestWorld, first: EndpointId, last: EndpointId) {
    for endpoint in first..=last {
        given_succeeding_command(world, endpoint);
    }
}

#[given("a timed-only on-off command on endpoint {endpoint}")]
fn given_timed_command(world: &mut TestWorld, endpoint: EndpointId) {
    add_command(
        world,
        toggle(endpoint),
        CommandMetadata::operate().timed(),
        Behaviour::Status(Status::Success),
    );
}

#[given("endpoint {endpoint} exists without the on-off cluster")]
fn given_endpoint_without_cluster(world: &mut TestWorld, endpoint: EndpointId) {
    add_command(
        world,
        ConcreteCommandPath::new(endpoint, 0x0008, 0x00),
        CommandMetadata::operate(),
        Behaviour::Status(Status::Success),
    );
}

#[given("group {group} contains endpoints {first} and {second}")]
fn given_group(world: &mut TestWorld, group: GroupId, first: EndpointId, second: EndpointId) {
    world.groups =
        std::mem::take(&mut world.groups).with_members(FABRIC, group, vec![first, second]);
    world.group = Some(group);
}

#[given("access to endpoint {endpoint} is denied")]
fn given_denied(world: &mut TestWorld, endpoint: EndpointId) {
    world.access =
        std::mem::take(&mut world.access).with_denial(toggle(endpoint), AccessDenial::Denied);
}

#[given("access to endpoint {endpoint} is restricted")]
fn given_restricted(world: &mut TestWorld, endpoint: EndpointId) {
    world.access =
        std::mem::take(&mut world.access).with_denial(toggle(endpoint), AccessDenial::Restricted);
}

#[given("response buffers of {size} bytes")]
fn given_buffer_size(world: &mut TestWorld, size: usize) {
    world.limits = EngineLimits {
        max_paths_per_invoke: 16,
        max_response_size: size,
        ..EngineLimits::default()
    };
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("a request invokes the on-off command on endpoint {endpoint}")]
fn when_invoke_one(world: &mut TestWorld, endpoint: EndpointId) {
    invoke_unicast(world, &[toggle(endpoint)], false);
}

#[when("a suppressed request invokes the on-off command on endpoint {endpoint}")]
fn when_invoke_suppressed(world: &mut TestWorld, endpoint: EndpointId) {
    invoke_unicast(world, &[toggle(endpoint)], true);
}

#[when("a request invokes the on-off command on endpoints {first} and {second}")]
fn when_invoke_two(world: &mut TestWorld, first: EndpointId, second: EndpointId) {
    invoke_unicast(world, &[toggle(first), toggle(second)], false);
}

#[when("a request invokes the on-off command on endpoints {first} to {last}")]
fn when_invoke_range(world: &mut TestWorld, first: EndpointId, last: EndpointId) {
    let paths: Vec<_> = (first..=last).map(toggle).collect();
    invoke_unicast(world, &paths, false);
}

#[when("a group request invokes the on-off command")]
fn when_invoke_group(world: &mut TestWorld) {
    let group = world.group.expect("a group was configured");
    let payload = encode_request(
        false,
        false,
        [RequestCommand::new(CommandPath::group(ON_OFF, TOGGLE)).with_fields(empty_fields())],
    );
    run(
        world,
        ExchangeContext::group(SubjectDescriptor::group(FABRIC, group), group),
        &payload,
        false,
    );
}

#[when("the deferred handle reports status {status}")]
fn when_deferred_reports(world: &mut TestWorld, status: String) {
    let reported = status_named(&status);
    for handle in harness(world).take_deferred() {
        handle.add_status(reported);
    }
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the request is accepted")]
fn then_accepted(world: &mut TestWorld) {
    assert_eq!(world.outcome, Some(Status::Success));
}

#[then("{count} response message is sent")]
fn then_messages_sent(world: &mut TestWorld, count: usize) {
    assert_eq!(harness(world).log.borrow().sent.len(), count);
}

#[then("no response message is sent")]
fn then_nothing_sent(world: &mut TestWorld) {
    let log = harness(world).log.borrow();
    assert!(log.sent.is_empty(), "unexpected messages: {:?}", log.sent);
}

#[then("the entry for ref {command_ref} carries a level report")]
fn then_ref_reports(world: &mut TestWorld, command_ref: u16) {
    let entry = entry_where(world, |entry| entry.command_ref() == Some(command_ref));
    assert!(
        matches!(entry, InvokeResponseEntry::Command { fields: Some(_), .. }),
        "expected a level report, got {entry:?}"
    );
}

#[then("the entry for ref {command_ref} carries status {status}")]
fn then_ref_status(world: &mut TestWorld, command_ref: u16, status: String) {
    let entry = entry_where(world, |entry| entry.command_ref() == Some(command_ref));
    assert_eq!(entry.status(), Some(StatusIb::new(status_named(&status))));
}

#[then("the entry for endpoint {endpoint} carries status {status}")]
fn then_endpoint_status(world: &mut TestWorld, endpoint: EndpointId, status: String) {
    let entry = entry_where(world, |entry| entry.path().endpoint == endpoint);
    assert_eq!(entry.status(), Some(StatusIb::new(status_named(&status))));
}

#[then("only endpoint {endpoint} ran the command")]
fn then_only_endpoint_ran(world: &mut TestWorld, endpoint: EndpointId) {
    assert_eq!(harness(world).invoked(), vec![toggle(endpoint)]);
}

#[then("the responses arrive in as few chunks as the buffer allows")]
fn then_minimal_chunks(world: &mut TestWorld) {
    let messages = harness(world).log.borrow().messages();
    let per_message = messages.first().expect("first message").responses.len();
    assert!(per_message > 0);
    assert_eq!(messages.len(), world.requested.div_ceil(per_message));
    let delivered: usize = messages.iter().map(|message| message.responses.len()).sum();
    assert_eq!(delivered, world.requested);
}

#[then("every chunk but the last announces more chunks")]
fn then_more_chunk_flags(world: &mut TestWorld) {
    let messages = harness(world).log.borrow().messages();
    let (last, chunks) = messages.split_last().expect("messages were sent");
    assert!(chunks.iter().all(|message| message.more_chunks));
    assert!(!last.more_chunks);
}

#[then("the exchange is released")]
fn then_released(world: &mut TestWorld) {
    let current = harness(world);
    assert_eq!(current.log.borrow().done, 1);
    assert_eq!(current.engine.state(), EngineState::AwaitingDestruction);
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Each command in a request is answered with its ref"
)]
fn commands_answered_with_refs(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Group commands run only where the command exists"
)]
fn group_fan_out(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Timed-only commands are refused outside a timed interaction"
)]
fn timed_only_commands(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Access control denies a command"
)]
fn access_denied(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Access control restricts a command"
)]
fn access_restricted(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Suppressed requests produce no response"
)]
fn suppressed_requests(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Large responses are split into chunks"
)]
fn chunked_responses(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/invoke.feature",
    name = "Deferred responses are sent once the handle is released"
)]
fn deferred_responses(world: TestWorld) {
    let _ = world;
}

//! Test doubles shared by the engine unit and behaviour tests.

mod behaviour;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use im_tlv::{Tag, TlvError, TlvWriter};

use crate::access::{AccessControl, AccessDenial, Privilege, SubjectDescriptor};
use crate::cluster::{ClusterTable, CommandLookup, CommandMetadata, CommandResponse};
use crate::message::{
    CommandFields, InvokeRequestBuilder, InvokeResponse, InvokeResponseEntry, RequestCommand,
};
use crate::path::{
    ClusterId, CommandId, CommandPath, ConcreteCommandPath, EndpointId, FabricIndex, GroupId,
};
use crate::status::Status;
use crate::{
    Collaborators, CommandContext, CommandFailure, CommandHandle, EngineLimits, ExchangeContext,
    ExchangeTransport, GroupMembership, InvokeEngine, TransportError,
};

pub(crate) const ON_OFF: ClusterId = 0x0006;
pub(crate) const TOGGLE: CommandId = 0x02;
pub(crate) const LEVEL_REPORT: CommandId = 0x0A;

pub(crate) const fn toggle(endpoint: EndpointId) -> ConcreteCommandPath {
    ConcreteCommandPath::new(endpoint, ON_OFF, TOGGLE)
}

pub(crate) fn encode_request(
    timed: bool,
    suppress: bool,
    commands: impl IntoIterator<Item = RequestCommand>,
) -> Vec<u8> {
    commands
        .into_iter()
        .fold(
            InvokeRequestBuilder::new()
                .timed_request(timed)
                .suppress_response(suppress),
            InvokeRequestBuilder::command,
        )
        .encode()
        .expect("encode invoke request")
}

/// One command per path, with refs numbered from 1 when there are several.
pub(crate) fn commands_for(paths: &[ConcreteCommandPath]) -> Vec<RequestCommand> {
    let with_refs = paths.len() > 1;
    paths
        .iter()
        .zip(1..)
        .map(|(path, token)| {
            let command = RequestCommand::new(CommandPath::from(*path)).with_fields(empty_fields());
            if with_refs {
                command.with_ref(token)
            } else {
                command
            }
        })
        .collect()
}

pub(crate) fn empty_fields() -> Vec<u8> {
    vec![0x15, 0x18]
}

/// Fields structure whose first member is `value` as a string.
pub(crate) fn text_fields(value: &str) -> Vec<u8> {
    let mut writer = TlvWriter::unbounded();
    writer.start_structure(Tag::Anonymous).expect("open fields");
    writer.put_str(Tag::Context(0), value).expect("text field");
    writer.end_container().expect("close fields");
    writer.finish().expect("finish fields")
}

pub(crate) fn level_fields(level: u64) -> Vec<u8> {
    let mut writer = TlvWriter::unbounded();
    writer.start_structure(Tag::Anonymous).expect("open fields");
    writer.put_u64(Tag::Context(0), level).expect("level field");
    writer.end_container().expect("close fields");
    writer.finish().expect("finish fields")
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Everything a [`RecordingTransport`] observed.
#[derive(Debug, Default)]
pub(crate) struct TransportLog {
    pub(crate) allocations: usize,
    pub(crate) send_attempts: usize,
    pub(crate) sent: Vec<Vec<u8>>,
    pub(crate) dropped: usize,
    pub(crate) done: usize,
}

impl TransportLog {
    pub(crate) fn messages(&self) -> Vec<InvokeResponse> {
        self.sent
            .iter()
            .map(|payload| InvokeResponse::parse(payload).expect("sent message parses"))
            .collect()
    }

    pub(crate) fn entries(&self) -> Vec<InvokeResponseEntry> {
        self.messages()
            .into_iter()
            .flat_map(|message| message.responses)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingTransport {
    log: Rc<RefCell<TransportLog>>,
    buffer_budget: Option<usize>,
    failing_sends: bool,
}

impl RecordingTransport {
    pub(crate) fn log(&self) -> Rc<RefCell<TransportLog>> {
        Rc::clone(&self.log)
    }

    /// Limits how many buffers the transport hands out.
    pub(crate) const fn with_buffer_budget(mut self, budget: usize) -> Self {
        self.buffer_budget = Some(budget);
        self
    }

    pub(crate) const fn failing_sends(mut self) -> Self {
        self.failing_sends = true;
        self
    }
}

impl ExchangeTransport for RecordingTransport {
    fn allocate_buffer(&mut self, max_size: usize) -> Option<Vec<u8>> {
        if let Some(budget) = self.buffer_budget.as_mut() {
            if *budget == 0 {
                return None;
            }
            *budget -= 1;
        }
        self.log.borrow_mut().allocations += 1;
        Some(Vec::with_capacity(max_size))
    }

    fn send(&mut self, message: Vec<u8>) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        log.send_attempts += 1;
        if self.failing_sends {
            return Err(TransportError::new("link down"));
        }
        log.sent.push(message);
        Ok(())
    }

    fn response_dropped(&mut self) {
        self.log.borrow_mut().dropped += 1;
    }

    fn on_done(&mut self) {
        self.log.borrow_mut().done += 1;
    }
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// Response carrying a level and optional filler bytes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LevelReport {
    pub(crate) level: u64,
    pub(crate) padding: usize,
}

impl CommandResponse for LevelReport {
    fn command_id(&self) -> CommandId {
        LEVEL_REPORT
    }

    fn encode_to(&self, writer: &mut TlvWriter, tag: Tag) -> Result<(), TlvError> {
        writer.start_structure(tag)?;
        writer.put_u64(Tag::Context(0), self.level)?;
        if self.padding > 0 {
            writer.put_bytes(Tag::Context(1), &vec![0xA5; self.padding])?;
        }
        writer.end_container()
    }
}

/// How a fake handler reacts to its command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Behaviour {
    Status(Status),
    Report { level: u64, padding: usize },
    /// Reads field 0 as an unsigned level and reports it back.
    EchoLevel,
    ClusterFailure(u8),
    Fail(Status),
    RespondThenFail,
    /// Adds a second status after the first.
    AnswerTwice,
    /// Responds, then defers anyway.
    RespondThenDefer,
    Defer,
    Silent,
}

#[derive(Debug, Default)]
pub(crate) struct FakeClusters {
    commands: HashMap<ConcreteCommandPath, (CommandMetadata, Behaviour)>,
    invocations: Rc<RefCell<Vec<ConcreteCommandPath>>>,
    deferred: Rc<RefCell<Vec<CommandHandle>>>,
}

impl FakeClusters {
    pub(crate) fn with_command(
        mut self,
        path: ConcreteCommandPath,
        metadata: CommandMetadata,
        behaviour: Behaviour,
    ) -> Self {
        self.commands.insert(path, (metadata, behaviour));
        self
    }

    pub(crate) fn invocations(&self) -> Rc<RefCell<Vec<ConcreteCommandPath>>> {
        Rc::clone(&self.invocations)
    }

    pub(crate) fn deferred(&self) -> Rc<RefCell<Vec<CommandHandle>>> {
        Rc::clone(&self.deferred)
    }
}

impl ClusterTable for FakeClusters {
    fn lookup(&self, path: &ConcreteCommandPath) -> CommandLookup {
        if let Some((metadata, _)) = self.commands.get(path) {
            return CommandLookup::Exists(*metadata);
        }
        let mut known = self.commands.keys();
        if known
            .clone()
            .any(|other| other.endpoint == path.endpoint && other.cluster == path.cluster)
        {
            CommandLookup::UnsupportedCommand
        } else if known.any(|other| other.endpoint == path.endpoint) {
            CommandLookup::UnsupportedCluster
        } else {
            CommandLookup::UnsupportedEndpoint
        }
    }

    fn invoke(
        &mut self,
        context: &mut CommandContext<'_>,
        fields: &CommandFields<'_>,
    ) -> Result<(), CommandFailure> {
        let path = *context.path();
        self.invocations.borrow_mut().push(path);
        let (_, behaviour) = self
            .commands
            .get(&path)
            .copied()
            .expect("dispatched commands exist");
        match behaviour {
            Behaviour::Status(status) => context.add_status(status),
            Behaviour::Report { level, padding } => context
                .add_response(&LevelReport { level, padding })
                .map_err(|error| CommandFailure::from(error.status()))?,
            Behaviour::EchoLevel => {
                let mut reader = fields.reader()?;
                let level = match reader.next_element()? {
                    Some(element) => element.as_u64()?,
                    None => 0,
                };
                context
                    .add_response(&LevelReport { level, padding: 0 })
                    .map_err(|error| CommandFailure::from(error.status()))?;
            }
            Behaviour::ClusterFailure(code) => context.add_cluster_specific_failure(code),
            Behaviour::Fail(status) => return Err(status.into()),
            Behaviour::RespondThenFail => {
                context.add_status(Status::Success);
                return Err(Status::Failure.into());
            }
            Behaviour::AnswerTwice => {
                context.add_status(Status::Success);
                context.add_status(Status::Busy);
            }
            Behaviour::RespondThenDefer => {
                context.add_status(Status::Success);
                self.deferred.borrow_mut().push(context.defer());
            }
            Behaviour::Defer => self.deferred.borrow_mut().push(context.defer()),
            Behaviour::Silent => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Access and groups
// ---------------------------------------------------------------------------

/// Grants everything except the listed paths.
#[derive(Debug, Default)]
pub(crate) struct PolicyAccess {
    denials: HashMap<ConcreteCommandPath, AccessDenial>,
}

impl PolicyAccess {
    pub(crate) fn with_denial(mut self, path: ConcreteCommandPath, denial: AccessDenial) -> Self {
        self.denials.insert(path, denial);
        self
    }
}

impl AccessControl for PolicyAccess {
    fn check(
        &self,
        _subject: &SubjectDescriptor,
        path: &ConcreteCommandPath,
        _privilege: Privilege,
    ) -> Result<(), AccessDenial> {
        self.denials.get(path).cloned().map_or(Ok(()), Err)
    }
}

#[derive(Debug, Default)]
pub(crate) struct StaticGroups {
    members: HashMap<(FabricIndex, GroupId), Vec<EndpointId>>,
}

impl StaticGroups {
    pub(crate) fn with_members(
        mut self,
        fabric_index: FabricIndex,
        group: GroupId,
        endpoints: Vec<EndpointId>,
    ) -> Self {
        self.members.insert((fabric_index, group), endpoints);
        self
    }
}

impl GroupMembership for StaticGroups {
    fn endpoints(&self, fabric_index: FabricIndex, group: GroupId) -> Vec<EndpointId> {
        self.members
            .get(&(fabric_index, group))
            .cloned()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub(crate) const FABRIC: FabricIndex = 1;

pub(crate) struct Setup {
    pub(crate) exchange: ExchangeContext,
    pub(crate) limits: EngineLimits,
    pub(crate) transport: RecordingTransport,
    pub(crate) clusters: FakeClusters,
    pub(crate) access: Box<dyn AccessControl>,
    pub(crate) groups: StaticGroups,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            exchange: ExchangeContext::unicast(SubjectDescriptor::case(FABRIC, 0x1122)),
            limits: EngineLimits::default(),
            transport: RecordingTransport::default(),
            clusters: FakeClusters::default(),
            access: Box::new(PolicyAccess::default()),
            groups: StaticGroups::default(),
        }
    }
}

impl Setup {
    pub(crate) fn start(self) -> Harness {
        let log = self.transport.log();
        let invocations = self.clusters.invocations();
        let deferred = self.clusters.deferred();
        let engine = InvokeEngine::new(
            self.exchange,
            self.limits,
            Box::new(self.transport),
            Collaborators {
                access: self.access,
                clusters: Box::new(self.clusters),
                groups: Box::new(self.groups),
            },
        );
        Harness {
            engine,
            log,
            invocations,
            deferred,
        }
    }
}

pub(crate) struct Harness {
    pub(crate) engine: InvokeEngine,
    pub(crate) log: Rc<RefCell<TransportLog>>,
    pub(crate) invocations: Rc<RefCell<Vec<ConcreteCommandPath>>>,
    pub(crate) deferred: Rc<RefCell<Vec<CommandHandle>>>,
}

impl Harness {
    pub(crate) fn entries(&self) -> Vec<InvokeResponseEntry> {
        self.log.borrow().entries()
    }

    pub(crate) fn invoked(&self) -> Vec<ConcreteCommandPath> {
        self.invocations.borrow().clone()
    }

    pub(crate) fn take_deferred(&self) -> Vec<CommandHandle> {
        std::mem::take(&mut *self.deferred.borrow_mut())
    }
}

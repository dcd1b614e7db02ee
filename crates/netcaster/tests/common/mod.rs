//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use netcaster::config::ScheduleConfig;
use netcaster::database::Database;
use netcaster::database::repositories::{
    ContentSeaOrmRepository, NetworkContentSeaOrmRepository, NetworkSeaOrmRepository,
    ProgrammeSeaOrmRepository,
};
use netcaster::errors::{ControlPlaneError, ControlPlaneResult};
use netcaster::models::{
    ContentItemCreateRequest, ContentRef, EpisodeCreateRequest, Network, NetworkCreateRequest,
    Provider,
};
use netcaster::services::ScheduleGenerator;
use netcaster::services::broadcast::{
    BroadcastSupervisor, ControlPlane, ControlPlaneProbe, LeaseRegistry, StartRequest,
    StartResponse, StopResponse, UpstreamResolver,
};

/// How the fake control plane answers start calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartBehaviour {
    Succeed,
    Unreachable,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Status(String),
    Start(String, StartRequest),
    Stop(String),
    Delete(String),
    Playlist(String),
    Segment(String, String),
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    running: HashSet<String>,
    playlists: HashMap<String, String>,
    segments: HashMap<(String, String), Bytes>,
    final_segment_number: Option<i64>,
    next_pid: i64,
}

/// In-memory stand-in for the transcoding control plane
pub struct FakeControlPlane {
    behaviour: Mutex<StartBehaviour>,
    state: Mutex<FakeState>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self {
            behaviour: Mutex::new(StartBehaviour::Succeed),
            state: Mutex::new(FakeState {
                next_pid: 4000,
                ..Default::default()
            }),
        }
    }

    pub fn set_behaviour(&self, behaviour: StartBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn set_final_segment_number(&self, number: i64) {
        self.state.lock().unwrap().final_segment_number = Some(number);
    }

    pub fn set_playlist(&self, token: &str, manifest: &str) {
        self.state
            .lock()
            .unwrap()
            .playlists
            .insert(token.to_string(), manifest.to_string());
    }

    pub fn set_segment(&self, token: &str, name: &str, bytes: &'static [u8]) {
        self.state
            .lock()
            .unwrap()
            .segments
            .insert((token.to_string(), name.to_string()), Bytes::from_static(bytes));
    }

    /// Simulate a transcoder crash
    pub fn kill(&self, token: &str) {
        self.state.lock().unwrap().running.remove(token);
    }

    pub fn is_running(&self, token: &str) -> bool {
        self.state.lock().unwrap().running.contains(token)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn start_requests(&self) -> Vec<StartRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Start(_, request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn not_found() -> ControlPlaneError {
        ControlPlaneError::Rejected {
            status: 404,
            message: "not found".to_string(),
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn status(&self, token: &str) -> ControlPlaneResult<bool> {
        self.record(Call::Status(token.to_string()));
        Ok(self.is_running(token))
    }

    async fn start(&self, token: &str, request: &StartRequest) -> ControlPlaneResult<StartResponse> {
        self.record(Call::Start(token.to_string(), request.clone()));
        match *self.behaviour.lock().unwrap() {
            StartBehaviour::Succeed => {
                let mut state = self.state.lock().unwrap();
                state.next_pid += 1;
                state.running.insert(token.to_string());
                Ok(StartResponse {
                    status: "started".to_string(),
                    pid: state.next_pid,
                })
            }
            StartBehaviour::Unreachable => Err(ControlPlaneError::Unreachable {
                message: "connection refused".to_string(),
            }),
            StartBehaviour::Reject => Err(ControlPlaneError::Rejected {
                status: 422,
                message: "source not playable".to_string(),
            }),
        }
    }

    async fn stop(&self, token: &str) -> ControlPlaneResult<StopResponse> {
        self.record(Call::Stop(token.to_string()));
        let mut state = self.state.lock().unwrap();
        state.running.remove(token);
        Ok(StopResponse {
            status: "stopped".to_string(),
            final_segment_number: state.final_segment_number,
        })
    }

    async fn delete(&self, token: &str) -> ControlPlaneResult<()> {
        self.record(Call::Delete(token.to_string()));
        let mut state = self.state.lock().unwrap();
        state.running.remove(token);
        state.playlists.remove(token);
        state.segments.retain(|(t, _), _| t != token);
        Ok(())
    }

    async fn fetch_playlist(&self, token: &str) -> ControlPlaneResult<String> {
        self.record(Call::Playlist(token.to_string()));
        let state = self.state.lock().unwrap();
        if !state.running.contains(token) {
            return Err(Self::not_found());
        }
        state.playlists.get(token).cloned().ok_or_else(Self::not_found)
    }

    async fn fetch_segment(&self, token: &str, segment: &str) -> ControlPlaneResult<Bytes> {
        self.record(Call::Segment(token.to_string(), segment.to_string()));
        let state = self.state.lock().unwrap();
        if !state.running.contains(token) {
            return Err(Self::not_found());
        }
        state
            .segments
            .get(&(token.to_string(), segment.to_string()))
            .cloned()
            .ok_or_else(Self::not_found)
    }
}

pub struct TestContext {
    pub database: Database,
    pub networks: NetworkSeaOrmRepository,
    pub pool: NetworkContentSeaOrmRepository,
    pub content: ContentSeaOrmRepository,
    pub programmes: ProgrammeSeaOrmRepository,
    pub generator: Arc<ScheduleGenerator>,
    pub supervisor: Arc<BroadcastSupervisor>,
    pub control_plane: Arc<FakeControlPlane>,
    pub leases: LeaseRegistry,
}

impl TestContext {
    pub async fn new() -> Self {
        let database = Database::new_in_memory().await.unwrap();
        let connection = database.connection();
        let control_plane = Arc::new(FakeControlPlane::new());
        let generator = Arc::new(ScheduleGenerator::new(&database, ScheduleConfig::default()));
        let leases = LeaseRegistry::new(Duration::from_secs(120));
        let supervisor = Arc::new(BroadcastSupervisor::new(
            &database,
            control_plane.clone(),
            Arc::new(ControlPlaneProbe::new(control_plane.clone())),
            generator.clone(),
            UpstreamResolver::new(),
            leases.clone(),
        ));

        Self {
            networks: NetworkSeaOrmRepository::new(connection.clone()),
            pool: NetworkContentSeaOrmRepository::new(connection.clone()),
            content: ContentSeaOrmRepository::new(connection.clone()),
            programmes: ProgrammeSeaOrmRepository::new(connection),
            database,
            generator,
            supervisor,
            control_plane,
            leases,
        }
    }

    pub async fn episode(&self, title: &str, duration_seconds: i64) -> ContentRef {
        self.content
            .create_episode(EpisodeCreateRequest {
                series_id: None,
                title: title.to_string(),
                description: Some(format!("{title} description")),
                cover: None,
                duration_seconds: Some(duration_seconds),
                stream_url: format!("http://media.local/{}.mkv", title.replace(' ', "_")),
                provider: Provider::Generic,
            })
            .await
            .unwrap()
    }

    /// A network whose pool holds one episode per duration, in order
    pub async fn network_with_pool(
        &self,
        name: &str,
        broadcast_enabled: bool,
        durations: &[i64],
    ) -> (Network, Vec<ContentRef>) {
        let network = self
            .networks
            .create(NetworkCreateRequest {
                broadcast_enabled,
                ..NetworkCreateRequest::new(name)
            })
            .await
            .unwrap();

        let mut contents = Vec::new();
        for (index, duration) in durations.iter().enumerate() {
            let content = self
                .episode(&format!("{name} item{}", index + 1), *duration)
                .await;
            self.pool
                .add(
                    &network.id,
                    ContentItemCreateRequest::new(content, index as i32),
                )
                .await
                .unwrap();
            contents.push(content);
        }

        (network, contents)
    }

    pub async fn reload(&self, network: &Network) -> Network {
        self.networks.find_by_id(&network.id).await.unwrap().unwrap()
    }
}

pub mod broadcast;
pub mod epg_exporter;
pub mod schedule_generator;

pub use broadcast::BroadcastSupervisor;
pub use epg_exporter::EpgExporter;
pub use schedule_generator::ScheduleGenerator;

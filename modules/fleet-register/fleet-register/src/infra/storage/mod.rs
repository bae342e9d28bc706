//! Persistence: `SeaORM` entities, migrations, scoped queries and repositories.

pub mod db;
pub mod entity;
pub mod migrations;
pub mod secure;

mod complaints_sea_repo;
mod filters;
mod machines_sea_repo;
mod maintenance_sea_repo;
mod parties_sea_repo;
mod references_sea_repo;

pub use complaints_sea_repo::OrmComplaintsRepository;
pub use machines_sea_repo::OrmMachinesRepository;
pub use maintenance_sea_repo::OrmMaintenanceRepository;
pub use parties_sea_repo::OrmPartiesRepository;
pub use references_sea_repo::OrmReferencesRepository;

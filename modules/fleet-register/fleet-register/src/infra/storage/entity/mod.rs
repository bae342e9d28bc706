pub mod complaint;
pub mod machine;
pub mod maintenance;
pub mod party;
pub mod party_role;
pub mod reference;

pub mod approval;
pub mod entity;
pub mod stage;
pub mod team;
pub mod workflow;

//! Integration test target — wires the scenario modules.

#[path = "integration/mock_adapter.rs"]
mod mock_adapter;
#[path = "integration/simulation.rs"]
mod simulation;

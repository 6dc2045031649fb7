// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod bench_configuration;
mod failure_handling;
mod propagation;
mod simulation_lifecycle;
mod step_retry;
mod time_bounds;

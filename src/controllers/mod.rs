pub mod journey_controller;

//! Scenario tests for pools and the registry driven through a recording host


mod registry_scenarios;

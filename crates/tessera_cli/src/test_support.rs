//! Project files shared by command tests.

use std::fs;
use std::path::Path;

use tessera_config::CONFIG_FILE_NAME;

use crate::GlobalArgs;

/// Three routers in a row, three cells apart, with one flow end to end.
///
/// Links are `0: 10->11`, `1: 11->10`, `2: 11->12`, `3: 12->11`.
pub const LINE: &str = r#"
[device]
width = 7
height = 1

[[device.tile_types]]
name = "noc_router"

[[device.tiles]]
tile_type = "noc_router"
x = 0
y = 0

[[device.tiles]]
tile_type = "noc_router"
x = 3
y = 0

[[device.tiles]]
tile_type = "noc_router"
x = 6
y = 0

[noc]
router_tile_name = "noc_router"
link_bandwidth = 100.0
link_latency = 1.0
router_latency = 1.0

[[noc.routers]]
id = 10
x = 0.0
y = 0.0
connections = [11]

[[noc.routers]]
id = 11
x = 3.0
y = 0.0
connections = [10, 12]

[[noc.routers]]
id = 12
x = 6.0
y = 0.0
connections = [11]

[[flows]]
name = "f0"
source = "cpu"
sink = "mem"
bandwidth = 10.0
route = [0, 2]

[placement]
cpu = { x = 0, y = 0 }
mem = { x = 6, y = 0 }
"#;

/// Writes `content` as the project file in `dir`.
pub fn write_project(dir: &Path, content: &str) {
    fs::write(dir.join(CONFIG_FILE_NAME), content).unwrap();
}

/// Quiet global flags pointing `--config` at `path`.
pub fn global_for(path: &Path) -> GlobalArgs {
    GlobalArgs {
        quiet: true,
        verbose: false,
        color: false,
        config: Some(path.display().to_string()),
    }
}

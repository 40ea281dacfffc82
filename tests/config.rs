//! Targeting an agent described by a configuration file.

use herd::config::Config;
use herd::engine::EngineRegistry;
use herd::target::evaluate_target;
use std::io::Write;
use tempfile::NamedTempFile;

const MINION: &str = r#"
id: web01.example.com
grains:
  os: Debian
  roles: [web, cache]
  ipv4: [10.0.0.5]
pillar:
  datacenter: ams1
nodegroups:
  web: G@roles:web and not L@web13.example.com
  db:
    - db01.example.com
    - db02.example.com
  ams: I@datacenter:ams1 and N@web
  loop: N@loop
"#;

fn load() -> Config {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(MINION.as_bytes()).unwrap();
    Config::load(file.path()).unwrap()
}

#[test]
fn configured_nodegroups_are_used() {
    let config = load();
    let ctx = config.context();
    let engines = EngineRegistry::standard();

    let nodegroups = &config.nodegroups;
    let verdict = |expression: &str| evaluate_target(expression, &ctx, &engines, nodegroups);
    assert!(verdict("N@web").unwrap());
    assert!(verdict("N@ams and S@10.0.0.0/8").unwrap());
    assert!(!verdict("N@db").unwrap());
    assert!(verdict("N@loop").is_err());
}

#[test]
fn nodegroups_keep_their_order() {
    let config = load();
    let names: Vec<&str> = config.nodegroups.iter().map(|(name, _)| name).collect();
    assert_eq!(vec!["web", "db", "ams", "loop"], names);
}

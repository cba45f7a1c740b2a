use duct::cmd;

pub fn test_on_host(filter: Option<&str>) -> anyhow::Result<()> {
    cmd!("cargo", "clippy", "--workspace", "--exclude", "efiboots-fuzz").run()?;

    let mut test_args = vec!["test", "--workspace", "--exclude", "efiboots-fuzz"];
    if let Some(filter) = filter {
        test_args.push(filter);
    }
    cmd("cargo", test_args).run()?;
    Ok(())
}

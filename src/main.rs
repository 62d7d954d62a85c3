fn main() -> anyhow::Result<()> {
    audioplot_lib::run()
}

fn main() -> anyhow::Result<()> {
    shade_ngin::flow::run()
}

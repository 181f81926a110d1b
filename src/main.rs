fn main() {
    lane_cycle_lib::run()
}

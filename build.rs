use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        // A register backend exists for the selected chip.
        device_selected: { feature = "atmega328p" },
        // Both clock features at once is a configuration error, reported in `clocks`.
        clock_conflict: { all(feature = "f_cpu_1mhz", feature = "f_cpu_8mhz") },
    }
}

#[derive(Clone, formwork::FormModel)]
struct Tracked<T> {
    value: T,
}

fn main() {}

use typestate_builder::Builder;

#[derive(Builder)]
pub struct Record {
    pub bar: u32,
    pub baz: u32,
}

fn main() {
    // `baz` is never set; `finalize` does not exist on this builder state.
    let _ = Record::builder().bar(1).finalize();
}

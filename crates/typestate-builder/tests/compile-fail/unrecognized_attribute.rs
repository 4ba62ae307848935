use typestate_builder::Builder;

#[derive(Builder)]
pub struct Record {
    #[builder(eac = "item")]
    pub items: Vec<u32>,
}

fn main() {}

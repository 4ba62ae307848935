use typestate_builder::Builder;

#[derive(Builder)]
pub struct Record {
    #[builder(each = "item")]
    pub total: u32,
}

fn main() {}

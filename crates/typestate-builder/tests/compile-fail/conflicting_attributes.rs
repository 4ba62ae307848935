use typestate_builder::Builder;

#[derive(Builder)]
pub struct Record {
    #[builder(value = Vec::new(), each = "item")]
    pub items: Vec<u32>,
}

fn main() {}

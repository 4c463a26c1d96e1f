/// Schema for the single DynamoDB table that holds every entity.
///
/// Every item is addressed by a string partition key `PK` and a string sort key `SK`. Entities
/// that need a second lookup path (users by email, projects by slug) also carry `GSI1PK` and
/// `GSI1SK`, which are indexed by the `GSI1` global secondary index.
///
/// NOTE: Non-key attribute names are camelCase and some of them (`name`, `status`, `type`,
/// `date`) are DynamoDB Reserved Words. Expressions must always refer to attributes through
/// `#name` placeholders.
///
/// Here is the list of DynamoDB Reserved Words:
/// https://docs.aws.amazon.com/amazondynamodb/latest/developerguide/ReservedWords.html
use lazy_static::lazy_static;
use rusoto_dynamodb::{
    AttributeDefinition, CreateTableInput, GlobalSecondaryIndex, KeySchemaElement, Projection,
    ProvisionedThroughput,
};

/// Base name of the table. Deployed tables carry an environment prefix, eg. "production-main".
pub const TABLE_NAME: &str = "main";

pub const PARTITION_KEY: &str = "PK";
pub const SORT_KEY: &str = "SK";

pub const GSI1_INDEX_NAME: &str = "GSI1";
pub const GSI1_PARTITION_KEY: &str = "GSI1PK";
pub const GSI1_SORT_KEY: &str = "GSI1SK";

lazy_static! {
    pub static ref TABLE_DEFINITIONS: Vec<CreateTableInput> = vec![CreateTableInput {
        /*
         * main
         *
         *   PK: string, eg. USER#u_<id>, PROJECT#p_<id>
         *   SK: string, eg. PROFILE, PROJECT#p_<id>, LANDING_PAGE, SIGNUP#<iso ts>#s_<id>,
         *       EVENT#<iso ts>#e_<id>, STATS#<yyyy-mm-dd>, VISITOR#<yyyy-mm-dd>#<visitor id>
         *   GSI1PK: string, EMAIL#<email> or SLUG#<slug>
         *   GSI1SK: string, USER or PROJECT
         *   entityType: string, USER | PROJECT | LANDING_PAGE | SIGNUP | EVENT | STATS | VISITOR
         *
         * primary key:
         *
         *   [PK, SK]
         *
         * global secondary indexes:
         *
         *   GSI1: [GSI1PK, GSI1SK]
         */
        table_name: TABLE_NAME.to_string(),
        attribute_definitions: vec![
            attr_def(PARTITION_KEY, "S"),
            attr_def(SORT_KEY, "S"),
            attr_def(GSI1_PARTITION_KEY, "S"),
            attr_def(GSI1_SORT_KEY, "S"),
        ],
        key_schema: vec![
            key_schema_elem(PARTITION_KEY, "HASH"),
            key_schema_elem(SORT_KEY, "RANGE"),
        ],
        global_secondary_indexes: Some(vec![GlobalSecondaryIndex {
            index_name: GSI1_INDEX_NAME.to_string(),
            key_schema: vec![
                key_schema_elem(GSI1_PARTITION_KEY, "HASH"),
                key_schema_elem(GSI1_SORT_KEY, "RANGE"),
            ],
            projection: Projection {
                projection_type: Some("ALL".to_string()),
                ..Default::default()
            },
            provisioned_throughput: default_provisioned_throughput(),
        }]),
        provisioned_throughput: default_provisioned_throughput(),
        ..Default::default()
    }];
}

/// Full table name for an environment, eg. `env_table_name("local", "main") == "local-main"`.
pub fn env_table_name(env: &str, base_table_name: &str) -> String {
    format!("{}-{}", env, base_table_name)
}

fn attr_def(attribute_name: &str, attribute_type: &str) -> AttributeDefinition {
    AttributeDefinition {
        attribute_name: attribute_name.to_string(),
        attribute_type: attribute_type.to_string(),
    }
}

fn key_schema_elem(attribute_name: &str, key_type: &str) -> KeySchemaElement {
    KeySchemaElement {
        attribute_name: attribute_name.to_string(),
        key_type: key_type.to_string(),
    }
}

fn default_provisioned_throughput() -> Option<ProvisionedThroughput> {
    Some(ProvisionedThroughput {
        read_capacity_units: 100,
        write_capacity_units: 100,
    })
}
